//! Unexpected-movement monitoring
//!
//! Detects servos that report angle changes while commanded idle and
//! escalates to an emergency stop after repeated detections.

pub mod movement;

pub use movement::{EmergencyPlan, MovementMonitor};
