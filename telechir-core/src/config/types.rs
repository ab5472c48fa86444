//! Configuration type definitions
//!
//! These types represent the console configuration. The console keeps no
//! persisted configuration; the firmware builds its config from the
//! standard defaults at boot and everything else is re-synchronized from
//! the rover.

use telechir_protocol::StreamParams;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rover link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// UART baud rate for the radio link
    pub baud: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { baud: 115_200 }
    }
}

/// Movement watchdog timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WatchdogConfig {
    /// Scheduler tick driving the watchdog task
    pub tick_ms: u32,
    /// Minimum time between evaluations of the same servo
    pub check_interval_ms: u32,
    /// Consecutive detections before an emergency stop
    pub strike_limit: u8,
    /// Delay between the two phases of an emergency stop
    pub escalation_delay_ms: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            check_interval_ms: 500,
            strike_limit: 3,
            escalation_delay_ms: 100,
        }
    }
}

/// Command timing behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeoutConfig {
    /// How long to wait for a motors-off acknowledgment before sending
    /// the backup stop
    pub ack_fallback_ms: u32,
    /// Settle time between stopping a servo and flipping its direction
    pub direction_settle_ms: u32,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ack_fallback_ms: 1000,
            direction_settle_ms: 500,
        }
    }
}

/// Video stream defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StreamConfig {
    /// JPEG quality (0-100)
    pub quality: u8,
    pub width: u16,
    pub height: u16,
    pub fps: u8,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            quality: 80,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl StreamConfig {
    /// Convert to the wire-level parameter block
    pub fn params(&self) -> StreamParams {
        StreamParams {
            quality: self.quality,
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }
}

/// Complete console configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsoleConfig {
    pub link: LinkConfig,
    pub watchdog: WatchdogConfig,
    pub timeouts: TimeoutConfig,
    pub stream: StreamConfig,
    /// Initial base speed for the drive controls (PWM duty)
    pub drive_speed: u8,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl ConsoleConfig {
    /// Defaults matching the shipped console hardware
    pub fn standard() -> Self {
        Self {
            link: LinkConfig::default(),
            watchdog: WatchdogConfig::default(),
            timeouts: TimeoutConfig::default(),
            stream: StreamConfig::default(),
            drive_speed: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_defaults() {
        let config = ConsoleConfig::standard();
        assert_eq!(config.watchdog.tick_ms, 200);
        assert_eq!(config.watchdog.check_interval_ms, 500);
        assert_eq!(config.watchdog.strike_limit, 3);
        assert_eq!(config.timeouts.ack_fallback_ms, 1000);
        assert_eq!(config.drive_speed, 128);
    }

    #[test]
    fn test_stream_params_conversion() {
        let params = StreamConfig::default().params();
        assert_eq!(params.quality, 80);
        assert_eq!(params.width, 640);
        assert_eq!(params.height, 480);
        assert_eq!(params.fps, 30);
    }
}
