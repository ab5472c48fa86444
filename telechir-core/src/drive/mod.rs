//! Wheel motor drive control
//!
//! Builds the drive commands behind the console's direction controls and
//! tracks which direction keys are held so motor power is cut exactly when
//! the last key is released.

use telechir_protocol::DriveCommand;

/// Three-step speed selector exposed on the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpeedLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl SpeedLevel {
    /// PWM duty for this level (thirds of full scale)
    pub fn pwm(self) -> u8 {
        match self {
            SpeedLevel::Low => 85,
            SpeedLevel::Medium => 170,
            SpeedLevel::High => 255,
        }
    }
}

/// Direction controls on the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DirectionKey {
    Forward,
    Backward,
    Left,
    Right,
}

impl DirectionKey {
    pub const ALL: [DirectionKey; 4] = [
        DirectionKey::Forward,
        DirectionKey::Backward,
        DirectionKey::Left,
        DirectionKey::Right,
    ];

    /// Drive command for this key at the given base speed
    pub fn command(self, speed: u8) -> DriveCommand {
        match self {
            DirectionKey::Forward => forward(speed),
            DirectionKey::Backward => backward(speed),
            DirectionKey::Left => turn_left(speed),
            DirectionKey::Right => turn_right(speed),
        }
    }
}

/// All four motors forward at `speed`
pub fn forward(speed: u8) -> DriveCommand {
    DriveCommand::Synchronized {
        speed,
        reverse: false,
    }
}

/// All four motors backward at `speed`
pub fn backward(speed: u8) -> DriveCommand {
    DriveCommand::Synchronized {
        speed,
        reverse: true,
    }
}

/// Pivot left: left pair at half speed reversed, right pair at full speed
pub fn turn_left(speed: u8) -> DriveCommand {
    DriveCommand::Differential {
        left: speed / 2,
        right: speed,
        reverse_left: true,
        reverse_right: false,
    }
}

/// Pivot right: left pair at full speed, right pair at half speed reversed
pub fn turn_right(speed: u8) -> DriveCommand {
    DriveCommand::Differential {
        left: speed,
        right: speed / 2,
        reverse_left: false,
        reverse_right: true,
    }
}

/// Held-key state for the direction controls
///
/// Key auto-repeat must not re-send drive commands, and motor power is cut
/// only when no direction key remains held.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveKeys {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
}

impl DriveKeys {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag_mut(&mut self, key: DirectionKey) -> &mut bool {
        match key {
            DirectionKey::Forward => &mut self.forward,
            DirectionKey::Backward => &mut self.backward,
            DirectionKey::Left => &mut self.left,
            DirectionKey::Right => &mut self.right,
        }
    }

    /// Record a key press; true if the key was not already held
    pub fn press(&mut self, key: DirectionKey) -> bool {
        let flag = self.flag_mut(key);
        let newly_pressed = !*flag;
        *flag = true;
        newly_pressed
    }

    /// Record a key release; true when no direction key remains held
    pub fn release(&mut self, key: DirectionKey) -> bool {
        *self.flag_mut(key) = false;
        self.none_held()
    }

    /// Clear all keys (console lost focus or went to sleep)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when no direction key is held
    pub fn none_held(&self) -> bool {
        !(self.forward || self.backward || self.left || self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_level_pwm() {
        assert_eq!(SpeedLevel::Low.pwm(), 85);
        assert_eq!(SpeedLevel::Medium.pwm(), 170);
        assert_eq!(SpeedLevel::High.pwm(), 255);
    }

    #[test]
    fn test_turn_mixes() {
        assert_eq!(
            turn_left(128),
            DriveCommand::Differential {
                left: 64,
                right: 128,
                reverse_left: true,
                reverse_right: false,
            }
        );
        assert_eq!(
            turn_right(128),
            DriveCommand::Differential {
                left: 128,
                right: 64,
                reverse_left: false,
                reverse_right: true,
            }
        );
    }

    #[test]
    fn test_press_ignores_auto_repeat() {
        let mut keys = DriveKeys::new();
        assert!(keys.press(DirectionKey::Forward));
        // Held key repeats are not new presses
        assert!(!keys.press(DirectionKey::Forward));
        assert!(keys.press(DirectionKey::Left));
    }

    #[test]
    fn test_release_cuts_power_only_when_last_key_lifts() {
        let mut keys = DriveKeys::new();
        keys.press(DirectionKey::Forward);
        keys.press(DirectionKey::Left);

        assert!(!keys.release(DirectionKey::Forward));
        assert!(keys.release(DirectionKey::Left));
    }

    #[test]
    fn test_release_of_unheld_key() {
        let mut keys = DriveKeys::new();
        assert!(keys.release(DirectionKey::Right));
        keys.press(DirectionKey::Backward);
        assert!(!keys.release(DirectionKey::Right));
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut keys = DriveKeys::new();
        keys.press(DirectionKey::Forward);
        keys.press(DirectionKey::Right);
        keys.clear();
        assert!(keys.none_held());
    }
}
