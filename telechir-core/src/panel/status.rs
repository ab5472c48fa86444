//! Status readout formatting
//!
//! Builds the short text lines the console screen shows for servo state,
//! motor state, and link health.

use core::fmt::Write;

use heapless::String;
use telechir_protocol::{DriveMode, MotorReadout, ServoId, ServoSpeed};

use crate::servo::ServoState;

/// Display label for a servo speed setting
pub fn speed_label(speed: ServoSpeed) -> &'static str {
    match speed {
        ServoSpeed::Low => "Low",
        ServoSpeed::Medium => "Medium",
        ServoSpeed::High => "High",
    }
}

/// Display name for a servo
pub fn servo_name(servo: ServoId) -> &'static str {
    match servo {
        ServoId::Pan => "Pan",
        ServoId::Rotate => "Rotate",
    }
}

/// Combined health of the link and the rover's device boards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkHealth {
    /// Motor and servo boards both reachable
    Full,
    /// Only the motor board reachable
    MotorsOnly,
    /// Only the servo board reachable
    ServosOnly,
    /// Link down or no board reachable
    Down,
}

impl LinkHealth {
    /// Classify from the transport state and the last device status
    pub fn classify(link_up: bool, motors_connected: bool, servos_connected: bool) -> Self {
        match (link_up, motors_connected, servos_connected) {
            (false, _, _) | (true, false, false) => LinkHealth::Down,
            (true, true, true) => LinkHealth::Full,
            (true, true, false) => LinkHealth::MotorsOnly,
            (true, false, true) => LinkHealth::ServosOnly,
        }
    }

    /// Status bar label
    pub fn label(self) -> &'static str {
        match self {
            LinkHealth::Full => "Connected (motors and servos)",
            LinkHealth::MotorsOnly => "Connected (motors only)",
            LinkHealth::ServosOnly => "Connected (servos only)",
            LinkHealth::Down => "Disconnected",
        }
    }
}

/// One-line readout for a servo: angle, limit, speed setting
pub fn servo_line(servo: ServoId, state: &ServoState) -> String<48> {
    let mut out = String::new();
    let _ = write!(
        out,
        "{}: {}° (limit {}°, {})",
        servo_name(servo),
        state.angle,
        state.limit,
        speed_label(state.speed),
    );
    out
}

/// Display label for a drive mode
pub fn mode_label(mode: DriveMode) -> &'static str {
    match mode {
        DriveMode::Off => "Off",
        DriveMode::Synchronized => "Synchronized",
        DriveMode::Differential => "Differential",
        DriveMode::Independent => "Independent",
    }
}

/// Multi-line readout for the wheel motors
pub fn motor_lines(mode: DriveMode, motors: &[MotorReadout; 4]) -> String<96> {
    let mut out = String::new();
    let _ = write!(out, "Mode: {}", mode_label(mode));
    if mode == DriveMode::Off {
        let _ = write!(out, "\nMotors off");
    } else {
        for (i, motor) in motors.iter().enumerate() {
            let dir = if motor.reverse { "rev" } else { "fwd" };
            let _ = write!(out, "\nM{}: {} ({dir})", i + 1, motor.speed);
        }
    }
    out
}
