//! Console-to-rover link protocol
//!
//! This crate defines the framed serial protocol between the Telechir
//! operator console and the rover. The link is bidirectional: the console
//! sends commands (servo moves, wheel drive modes, stream control) and the
//! rover sends telemetry (servo angles, motor state, video frames, device
//! connectivity) plus per-command acknowledgments.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬─────┬────────┬──────┬──────────────┬──────────┐
//! │ START │ SEQ │ LENGTH │ TYPE │ PAYLOAD      │ CHECKSUM │
//! │ 1B    │ 1B  │ 2B LE  │ 1B   │ 0–1024B      │ 1B       │
//! └───────┴─────┴────────┴──────┴──────────────┴──────────┘
//! ```
//!
//! SEQ correlates a command with its acknowledgment: the console stamps
//! each outbound command with a sequence number and the rover echoes it in
//! the `Ack` payload. Telemetry frames carry SEQ 0. Reconnection and
//! retransmission below this layer belong to the radio link, not to this
//! crate.

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod frame;
pub mod telemetry;

pub use command::{
    ConsoleCommand, DriveCommand, ServoAction, ServoId, ServoRequest, ServoSpeed, StatusKind,
    StreamParams,
};
pub use frame::{Frame, FrameError, FrameParser, FRAME_START, MAX_PAYLOAD_SIZE};
pub use telemetry::{DriveMode, MotorReadout, RobotMessage, MAX_VIDEO_CHUNK};
