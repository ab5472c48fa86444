//! Configuration types
//!
//! Board-agnostic configuration structures with compiled-in defaults.

pub mod types;

pub use types::*;
