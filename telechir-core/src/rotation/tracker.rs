//! Rotation accumulation and limit detection
//!
//! A tracker accumulates the absolute angular travel of one movement
//! episode from successive angle reports, independent of whether the
//! reported angle wraps across the servo's 0°/max° boundary. It assumes
//! no single reporting interval covers more than half the servo's range;
//! faster real motion would be under-counted.

use telechir_protocol::ServoId;

use crate::servo::ServoKind;

/// Accumulated rotation state for one movement episode
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RotationTracker {
    /// Angle at episode start
    pub start_angle: u16,
    /// Angle at the last update
    pub last_angle: u16,
    /// Accumulated absolute rotation since episode start, in degrees
    ///
    /// Never decreases within an episode.
    pub total_rotation: u32,
    /// Sign of the first observed movement (0 until observed)
    ///
    /// Locked in for the episode; a mid-episode reversal does not change
    /// it. Informational only, not used by the limit check.
    pub direction: i8,
    /// Whether an episode is currently tracked
    pub initialized: bool,
}

impl RotationTracker {
    /// Begin a new episode with the given baseline angle
    pub fn initialize(&mut self, angle: u16) {
        self.start_angle = angle;
        self.last_angle = angle;
        self.total_rotation = 0;
        self.direction = 0;
        self.initialized = true;
    }

    /// Feed a new angle report and return the accumulated total
    ///
    /// The first report after a reset only establishes the baseline and
    /// contributes nothing to the total.
    pub fn update(&mut self, angle: u16, range: u16) -> u32 {
        if !self.initialized {
            self.initialize(angle);
            return 0;
        }

        let mut diff = angle as i32 - self.last_angle as i32;

        // Correct for crossings of the 0°/range boundary. A diff of
        // exactly half the range is left alone.
        let half = (range / 2) as i32;
        if diff > half {
            diff -= range as i32;
        }
        if diff < -half {
            diff += range as i32;
        }

        if self.direction == 0 && diff != 0 {
            self.direction = if diff > 0 { 1 } else { -1 };
        }

        self.total_rotation += diff.unsigned_abs();
        self.last_angle = angle;

        self.total_rotation
    }

    /// End the episode and clear the accumulator
    pub fn reset(&mut self) {
        self.initialized = false;
        self.total_rotation = 0;
        self.direction = 0;
    }
}

/// One tracker per servo, keyed by [`ServoId`]
#[derive(Debug, Clone, Default)]
pub struct RotationLimiter {
    pan: RotationTracker,
    rotate: RotationTracker,
}

impl RotationLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access a servo's tracker
    pub fn tracker(&self, servo: ServoId) -> &RotationTracker {
        match servo {
            ServoId::Pan => &self.pan,
            ServoId::Rotate => &self.rotate,
        }
    }

    fn tracker_mut(&mut self, servo: ServoId) -> &mut RotationTracker {
        match servo {
            ServoId::Pan => &mut self.pan,
            ServoId::Rotate => &mut self.rotate,
        }
    }

    /// Feed an angle report for a servo
    ///
    /// Returns true when the accumulated rotation has reached or exceeded
    /// `limit`. Angles are taken as reported; out-of-range readings flow
    /// into the accumulator unchecked.
    pub fn update(&mut self, servo: ServoId, angle: u16, limit: u16) -> bool {
        let range = ServoKind::of(servo).range();
        let tracker = self.tracker_mut(servo);
        if !tracker.initialized {
            tracker.initialize(angle);
            return false;
        }
        tracker.update(angle, range) >= limit as u32
    }

    /// End a servo's episode
    ///
    /// Called on stop, on a limit-triggered stop, and before every new
    /// move or limit change, so the next episode starts from a fresh
    /// baseline.
    pub fn reset(&mut self, servo: ServoId) {
        self.tracker_mut(servo).reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_establishes_baseline() {
        let mut limiter = RotationLimiter::new();
        assert!(!limiter.update(ServoId::Pan, 170, 90));
        let tracker = limiter.tracker(ServoId::Pan);
        assert!(tracker.initialized);
        assert_eq!(tracker.start_angle, 170);
        assert_eq!(tracker.total_rotation, 0);
    }

    #[test]
    fn test_accumulates_absolute_differences() {
        let mut limiter = RotationLimiter::new();
        limiter.update(ServoId::Pan, 10, 180);
        limiter.update(ServoId::Pan, 40, 180);
        limiter.update(ServoId::Pan, 20, 180);
        assert_eq!(limiter.tracker(ServoId::Pan).total_rotation, 50);
    }

    #[test]
    fn test_wrap_correction_positional() {
        // 170° → 10° on a 0-180° servo is +20° through the boundary,
        // not -160°
        let mut limiter = RotationLimiter::new();
        limiter.update(ServoId::Pan, 170, 180);
        limiter.update(ServoId::Pan, 10, 180);
        assert_eq!(limiter.tracker(ServoId::Pan).total_rotation, 20);
    }

    #[test]
    fn test_wrap_correction_continuous() {
        // 350° → 20° on a 0-360° servo is +30° through the boundary
        let mut limiter = RotationLimiter::new();
        limiter.update(ServoId::Rotate, 350, 360);
        limiter.update(ServoId::Rotate, 20, 360);
        assert_eq!(limiter.tracker(ServoId::Rotate).total_rotation, 30);
    }

    #[test]
    fn test_exact_half_range_diff_uncorrected() {
        // A diff of exactly 90° on a 0-180° servo stays 90°: the strict
        // comparison leaves the boundary case alone
        let mut limiter = RotationLimiter::new();
        limiter.update(ServoId::Pan, 0, 180);
        limiter.update(ServoId::Pan, 90, 180);
        assert_eq!(limiter.tracker(ServoId::Pan).total_rotation, 90);
    }

    #[test]
    fn test_limit_reached_on_threshold() {
        // 0 → 30 → 60 → 95 with limit 90: false, false, true
        let mut limiter = RotationLimiter::new();
        assert!(!limiter.update(ServoId::Pan, 0, 90));
        assert!(!limiter.update(ServoId::Pan, 30, 90));
        assert!(!limiter.update(ServoId::Pan, 60, 90));
        assert!(limiter.update(ServoId::Pan, 95, 90));
    }

    #[test]
    fn test_limit_exactly_met() {
        let mut limiter = RotationLimiter::new();
        limiter.update(ServoId::Pan, 0, 90);
        assert!(!limiter.update(ServoId::Pan, 45, 90));
        assert!(limiter.update(ServoId::Pan, 90, 90));
    }

    #[test]
    fn test_direction_locked_on_first_movement() {
        let mut limiter = RotationLimiter::new();
        limiter.update(ServoId::Pan, 50, 180);
        limiter.update(ServoId::Pan, 40, 180);
        assert_eq!(limiter.tracker(ServoId::Pan).direction, -1);
        // A reversal keeps accumulating but does not re-evaluate direction
        limiter.update(ServoId::Pan, 60, 180);
        assert_eq!(limiter.tracker(ServoId::Pan).direction, -1);
        assert_eq!(limiter.tracker(ServoId::Pan).total_rotation, 30);
    }

    #[test]
    fn test_zero_diff_leaves_direction_unset() {
        let mut limiter = RotationLimiter::new();
        limiter.update(ServoId::Pan, 50, 180);
        limiter.update(ServoId::Pan, 50, 180);
        assert_eq!(limiter.tracker(ServoId::Pan).direction, 0);
    }

    #[test]
    fn test_reset_discards_pre_reset_angle() {
        let mut limiter = RotationLimiter::new();
        limiter.update(ServoId::Pan, 0, 90);
        limiter.update(ServoId::Pan, 60, 90);
        limiter.reset(ServoId::Pan);

        // The next update re-baselines; the 60° → 120° jump is not counted
        assert!(!limiter.update(ServoId::Pan, 120, 90));
        assert_eq!(limiter.tracker(ServoId::Pan).total_rotation, 0);
        limiter.update(ServoId::Pan, 130, 90);
        assert_eq!(limiter.tracker(ServoId::Pan).total_rotation, 10);
    }

    #[test]
    fn test_total_never_decreases() {
        let mut limiter = RotationLimiter::new();
        let angles = [0u16, 30, 10, 170, 10, 90, 90, 45];
        let mut prev_total = 0;
        for angle in angles {
            limiter.update(ServoId::Pan, angle, u16::MAX);
            let total = limiter.tracker(ServoId::Pan).total_rotation;
            assert!(total >= prev_total);
            prev_total = total;
        }
    }

    #[test]
    fn test_out_of_range_reading_propagates() {
        // No validation against the physical range: a 400° report on the
        // pan servo flows straight into the accumulator
        let mut limiter = RotationLimiter::new();
        limiter.update(ServoId::Pan, 0, u16::MAX);
        limiter.update(ServoId::Pan, 400, u16::MAX);
        // diff 400 > 90, corrected once by -180 → 220
        assert_eq!(limiter.tracker(ServoId::Pan).total_rotation, 220);
    }
}
