//! Movement monitor implementation
//!
//! A servo whose angle keeps changing while its commanded state is "not
//! moving" points at external interference, backlash, or a miscommunicated
//! stop. The monitor samples each servo on a coarse per-servo cadence
//! (driven by a finer scheduler tick) and reports a servo for emergency
//! stop after three consecutive discrepant samples.

use heapless::Vec;
use telechir_protocol::{ServoAction, ServoId, ServoRequest, ServoSpeed};

use crate::servo::{ServoBank, ServoKind};

/// Default per-servo evaluation interval in milliseconds
pub const CHECK_INTERVAL_MS: u32 = 500;

/// Default consecutive detections before escalating
pub const STRIKE_LIMIT: u8 = 3;

/// Sampling state for one servo
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct MonitorEntry {
    /// Time of the last evaluation
    last_check_ms: u32,
    /// Angle sampled one evaluation ago
    prev_angle: Option<u16>,
    /// Angle sampled at the last evaluation
    current_angle: Option<u16>,
    /// Consecutive discrepant evaluations
    error_count: u8,
}

/// Watchdog state for both servos
#[derive(Debug, Clone)]
pub struct MovementMonitor {
    pan: MonitorEntry,
    rotate: MonitorEntry,
    check_interval_ms: u32,
    strike_limit: u8,
}

impl Default for MovementMonitor {
    fn default() -> Self {
        Self::new(CHECK_INTERVAL_MS, STRIKE_LIMIT)
    }
}

impl MovementMonitor {
    /// Create a monitor with the given per-servo cadence and strike limit
    pub fn new(check_interval_ms: u32, strike_limit: u8) -> Self {
        Self {
            pan: MonitorEntry::default(),
            rotate: MonitorEntry::default(),
            check_interval_ms,
            strike_limit,
        }
    }

    fn entry_mut(&mut self, servo: ServoId) -> &mut MonitorEntry {
        match servo {
            ServoId::Pan => &mut self.pan,
            ServoId::Rotate => &mut self.rotate,
        }
    }

    /// Consecutive discrepant evaluations recorded for a servo
    pub fn error_count(&self, servo: ServoId) -> u8 {
        match servo {
            ServoId::Pan => self.pan.error_count,
            ServoId::Rotate => self.rotate.error_count,
        }
    }

    /// Run one scheduler tick and return the servos requiring an
    /// emergency stop
    ///
    /// Each servo is evaluated only once more than the per-servo interval
    /// has elapsed since its previous evaluation; calling this on a finer
    /// cadence is expected. The counter of a reported servo is zeroed so
    /// escalation fires once per burst of detections.
    pub fn poll(&mut self, now_ms: u32, servos: &ServoBank) -> Vec<ServoId, 2> {
        let mut escalations = Vec::new();
        let interval = self.check_interval_ms;
        let limit = self.strike_limit;

        for servo in ServoId::ALL {
            let state = *servos.get(servo);
            let entry = self.entry_mut(servo);

            if now_ms.saturating_sub(entry.last_check_ms) <= interval {
                continue;
            }
            entry.last_check_ms = now_ms;

            entry.prev_angle = entry.current_angle;
            entry.current_angle = Some(state.angle);

            let drifted = !state.moving
                && entry.prev_angle.is_some()
                && entry.prev_angle != entry.current_angle;

            if drifted {
                entry.error_count = entry.error_count.saturating_add(1);
                if entry.error_count >= limit {
                    // Vec is sized for every servo; push cannot fail
                    let _ = escalations.push(servo);
                    entry.error_count = 0;
                }
            } else {
                entry.error_count = 0;
            }
        }

        escalations
    }
}

/// Two-phase recovery sequence for a runaway servo
///
/// A single stop is not enough for either servo class: the continuous
/// servo needs to be driven to neutral before the stop takes, and the
/// positional servo needs an explicit hold command after the stop so it
/// actively resists whatever moved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EmergencyPlan {
    /// Command to send immediately
    pub immediate: ServoRequest,
    /// Command to send after `followup_delay_ms`
    pub followup: ServoRequest,
    pub followup_delay_ms: u32,
}

impl EmergencyPlan {
    /// Build the recovery sequence for a servo at its current angle
    pub fn for_servo(servo: ServoId, current_angle: u16, followup_delay_ms: u32) -> Self {
        let kind = ServoKind::of(servo);
        let stop = ServoRequest::new(
            servo,
            ServoAction::Stop {
                priority: true,
                force: true,
            },
        );
        match kind {
            ServoKind::Continuous => Self {
                immediate: ServoRequest::new(
                    servo,
                    ServoAction::Move {
                        angle: kind.neutral(),
                        speed: ServoSpeed::Low,
                        force: true,
                    },
                ),
                followup: stop,
                followup_delay_ms,
            },
            ServoKind::Positional => Self {
                immediate: stop,
                followup: ServoRequest::new(
                    servo,
                    ServoAction::Move {
                        angle: current_angle,
                        speed: ServoSpeed::Low,
                        force: true,
                    },
                ),
                followup_delay_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank_with_angle(servo: ServoId, angle: u16, moving: bool) -> ServoBank {
        let mut bank = ServoBank::new();
        let state = bank.get_mut(servo);
        state.angle = angle;
        state.moving = moving;
        bank
    }

    #[test]
    fn test_no_escalation_while_moving() {
        let mut monitor = MovementMonitor::default();
        let mut bank = bank_with_angle(ServoId::Pan, 0, true);

        for (i, angle) in [10u16, 20, 30, 40, 50].iter().enumerate() {
            bank.get_mut(ServoId::Pan).angle = *angle;
            let now = 501 * (i as u32 + 1);
            assert!(monitor.poll(now, &bank).is_empty());
        }
        assert_eq!(monitor.error_count(ServoId::Pan), 0);
    }

    #[test]
    fn test_three_drifting_samples_escalate_once() {
        let mut monitor = MovementMonitor::default();
        let mut bank = bank_with_angle(ServoId::Pan, 0, false);

        // Baseline sample
        assert!(monitor.poll(501, &bank).is_empty());

        // Three successive angle changes while marked idle
        bank.get_mut(ServoId::Pan).angle = 5;
        assert!(monitor.poll(1002, &bank).is_empty());
        bank.get_mut(ServoId::Pan).angle = 10;
        assert!(monitor.poll(1503, &bank).is_empty());
        bank.get_mut(ServoId::Pan).angle = 15;
        let escalations = monitor.poll(2004, &bank);
        assert_eq!(escalations.as_slice(), &[ServoId::Pan]);

        // Counter was zeroed on escalation
        assert_eq!(monitor.error_count(ServoId::Pan), 0);
    }

    #[test]
    fn test_clean_sample_resets_counter() {
        let mut monitor = MovementMonitor::default();
        let mut bank = bank_with_angle(ServoId::Pan, 0, false);

        monitor.poll(501, &bank);
        bank.get_mut(ServoId::Pan).angle = 5;
        monitor.poll(1002, &bank);
        bank.get_mut(ServoId::Pan).angle = 10;
        monitor.poll(1503, &bank);
        assert_eq!(monitor.error_count(ServoId::Pan), 2);

        // Angle holds still for one evaluation
        monitor.poll(2004, &bank);
        assert_eq!(monitor.error_count(ServoId::Pan), 0);

        // Drift resumes; needs three fresh strikes again
        bank.get_mut(ServoId::Pan).angle = 15;
        assert!(monitor.poll(2505, &bank).is_empty());
    }

    #[test]
    fn test_per_servo_cadence_gating() {
        let mut monitor = MovementMonitor::default();
        let mut bank = bank_with_angle(ServoId::Pan, 0, false);

        monitor.poll(501, &bank);
        bank.get_mut(ServoId::Pan).angle = 5;

        // 200 ms later: below the per-servo interval, no evaluation
        monitor.poll(701, &bank);
        assert_eq!(monitor.error_count(ServoId::Pan), 0);

        // Past the interval the pending drift is seen
        monitor.poll(1002, &bank);
        assert_eq!(monitor.error_count(ServoId::Pan), 1);
    }

    #[test]
    fn test_exact_interval_not_yet_due() {
        let mut monitor = MovementMonitor::default();
        let bank = bank_with_angle(ServoId::Pan, 0, false);

        monitor.poll(501, &bank);
        // Exactly the interval later: strict comparison, not yet due
        let mut clone = bank.clone();
        clone.get_mut(ServoId::Pan).angle = 5;
        monitor.poll(1001, &clone);
        assert_eq!(monitor.error_count(ServoId::Pan), 0);
    }

    #[test]
    fn test_servos_monitored_independently() {
        let mut monitor = MovementMonitor::default();
        let mut bank = ServoBank::new();
        bank.get_mut(ServoId::Rotate).moving = false;

        monitor.poll(501, &bank);
        for step in 1..=3u16 {
            bank.get_mut(ServoId::Rotate).angle = step * 10;
            let now = 501 + 501 * step as u32;
            let escalations = monitor.poll(now, &bank);
            if step == 3 {
                assert_eq!(escalations.as_slice(), &[ServoId::Rotate]);
            } else {
                assert!(escalations.is_empty());
            }
        }
        assert_eq!(monitor.error_count(ServoId::Pan), 0);
    }

    #[test]
    fn test_continuous_plan_moves_to_neutral_then_stops() {
        let plan = EmergencyPlan::for_servo(ServoId::Rotate, 270, 100);
        assert_eq!(
            plan.immediate.action,
            ServoAction::Move {
                angle: 90,
                speed: ServoSpeed::Low,
                force: true,
            }
        );
        assert_eq!(
            plan.followup.action,
            ServoAction::Stop {
                priority: true,
                force: true,
            }
        );
        assert_eq!(plan.followup_delay_ms, 100);
    }

    #[test]
    fn test_positional_plan_stops_then_holds() {
        let plan = EmergencyPlan::for_servo(ServoId::Pan, 135, 100);
        assert_eq!(
            plan.immediate.action,
            ServoAction::Stop {
                priority: true,
                force: true,
            }
        );
        assert_eq!(
            plan.followup.action,
            ServoAction::Move {
                angle: 135,
                speed: ServoSpeed::Low,
                force: true,
            }
        );
    }
}
