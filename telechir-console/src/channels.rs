//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy
//! tasks. Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use telechir_core::console::Outbound;
use telechir_core::drive::DirectionKey;
use telechir_protocol::{RobotMessage, ServoId};

/// Channel capacity for operator input actions
const INPUT_CHANNEL_SIZE: usize = 8;

/// Channel capacity for inbound telemetry (video frames dominate)
const TELEMETRY_CHANNEL_SIZE: usize = 4;

/// Channel capacity for outbound commands
const OUTBOUND_CHANNEL_SIZE: usize = 16;

/// Operator input decoded by the input task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputAction {
    /// A direction key changed state
    DriveKey { key: DirectionKey, pressed: bool },
    /// A servo knob settled on a new value (sets the limit and the move
    /// target, like the panel slider it replaces)
    ServoKnob { servo: ServoId, angle: u16 },
    /// The drive speed knob settled on a new value
    DriveSpeedKnob { value: u8 },
    /// Move button: send the servo to its knob angle
    ServoMove { servo: ServoId },
    /// Stop button
    ServoStop { servo: ServoId },
    /// Cycle the servo's speed setting
    ServoSpeedCycle { servo: ServoId },
    /// Direction inversion toggle
    ServoReverse { servo: ServoId },
    /// Start/stop the video stream
    StreamToggle,
}

/// Operator input actions from the input task
pub static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, InputAction, INPUT_CHANNEL_SIZE> =
    Channel::new();

/// Parsed telemetry from the link RX task
pub static TELEMETRY_CHANNEL: Channel<
    CriticalSectionRawMutex,
    RobotMessage,
    TELEMETRY_CHANNEL_SIZE,
> = Channel::new();

/// Commands from the coordinator to the link TX task
pub static OUTBOUND_CHANNEL: Channel<CriticalSectionRawMutex, Outbound, OUTBOUND_CHANNEL_SIZE> =
    Channel::new();

/// Watchdog evaluation request carrying the current uptime in ms
pub static WATCHDOG_POLL: Signal<CriticalSectionRawMutex, u32> = Signal::new();
