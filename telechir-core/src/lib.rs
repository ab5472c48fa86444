//! Board-agnostic console logic for the rover operator console
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Servo state model for the camera head
//! - Per-episode rotation limiting
//! - Unexpected-movement monitoring and emergency stop escalation
//! - Wheel motor drive command construction and key-state tracking
//! - Video stream lifecycle
//! - Log panel and status display formatting
//! - The console coordinator tying the above to the rover link
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod console;
pub mod drive;
pub mod monitor;
pub mod panel;
pub mod rotation;
pub mod servo;
pub mod stream;
