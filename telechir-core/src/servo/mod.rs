//! Camera-head servo model
//!
//! The rover's camera head carries two servos with different mechanics:
//! a positional pan servo and a continuous-rotation head servo. Their
//! state is mirrored on the console from rover telemetry.

pub mod state;

pub use state::{ServoBank, ServoKind, ServoState};
