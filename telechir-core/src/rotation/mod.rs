//! Per-episode rotation limiting
//!
//! Bounds how far a servo travels during one commanded movement episode
//! and signals when the configured limit is reached.

pub mod tracker;

pub use tracker::{RotationLimiter, RotationTracker};
