//! Metric-specific stateful filters layered under the generic throttle.

use charge_telemetry::{stage_name, RESTING_STAGE};
use time::{Duration, OffsetDateTime};

/// Suppresses the controller's spurious zero-power readings during its
/// periodic sweep. While the stage says we are producing and the last
/// published power was above the floor, a burst of zeros is replaced by
/// that last value — up to `cap` consecutive frames, which bounds how
/// long a real shutdown can be hidden.
#[derive(Default)]
pub struct ZeroDropout {
    zero_streak: u32,
    last_published: f64,
}

impl ZeroDropout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&mut self, raw: f64, producing: bool, floor: f64, cap: u32) -> f64 {
        if raw == 0.0 && self.last_published > floor && producing {
            self.zero_streak += 1;
            if self.zero_streak <= cap {
                return self.last_published;
            }
            // Streak outlived the cap: treat the zero as real.
            return 0.0;
        }
        self.zero_streak = 0;
        raw
    }

    /// Record what actually went out, so later zeros substitute the right
    /// value.
    pub fn note_published(&mut self, value: f64) {
        self.last_published = value;
    }

    pub fn last_published(&self) -> f64 {
        self.last_published
    }
}

/// Debounces the noisy zero ("Resting") stage code near transitions: a
/// non-zero code wins immediately, zero must persist for `threshold`
/// consecutive frames before the stage flips.
#[derive(Default)]
pub struct StageDebounce {
    resting_streak: u32,
}

impl StageDebounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stage to adopt, or `None` while a zero streak is still
    /// below the debounce threshold.
    pub fn observe(&mut self, code: u8, threshold: u32) -> Option<String> {
        if code != 0 {
            self.resting_streak = 0;
            return Some(stage_name(code));
        }
        self.resting_streak += 1;
        if self.resting_streak >= threshold {
            Some(RESTING_STAGE.to_string())
        } else {
            None
        }
    }
}

/// Forces an immediate publish when a high-value metric swings by more
/// than the change threshold, with a heartbeat so the topic never goes
/// stale. Independent of the generic throttle's own bookkeeping.
pub struct DeltaForce {
    last_value: f64,
    last_at: Option<OffsetDateTime>,
}

impl DeltaForce {
    pub fn new() -> Self {
        Self {
            last_value: 0.0,
            last_at: None,
        }
    }

    pub fn check(
        &mut self,
        value: f64,
        threshold: f64,
        interval: Duration,
        now: OffsetDateTime,
    ) -> bool {
        let due = match self.last_at {
            None => true,
            Some(at) => (value - self.last_value).abs() >= threshold || now - at > interval,
        };
        if due {
            self.last_value = value;
            self.last_at = Some(now);
        }
        due
    }
}

impl Default for DeltaForce {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    #[test]
    fn dropout_substitutes_up_to_cap_then_releases() {
        let mut dropout = ZeroDropout::new();
        dropout.note_published(500.0);
        for _ in 0..15 {
            assert_eq!(dropout.filter(0.0, true, 10.0, 15), 500.0);
        }
        // The sixteenth consecutive zero is a real shutdown.
        assert_eq!(dropout.filter(0.0, true, 10.0, 15), 0.0);
    }

    #[test]
    fn dropout_needs_a_producing_stage_and_prior_power() {
        let mut dropout = ZeroDropout::new();
        dropout.note_published(500.0);
        assert_eq!(dropout.filter(0.0, false, 10.0, 15), 0.0);

        let mut idle = ZeroDropout::new();
        idle.note_published(5.0); // below the producing floor
        assert_eq!(idle.filter(0.0, true, 10.0, 15), 0.0);
    }

    #[test]
    fn nonzero_reading_resets_the_streak() {
        let mut dropout = ZeroDropout::new();
        dropout.note_published(500.0);
        for _ in 0..14 {
            dropout.filter(0.0, true, 10.0, 15);
        }
        assert_eq!(dropout.filter(480.0, true, 10.0, 15), 480.0);
        // Streak restarted: a fresh burst gets the full cap again.
        dropout.note_published(480.0);
        for _ in 0..15 {
            assert_eq!(dropout.filter(0.0, true, 10.0, 15), 480.0);
        }
    }

    #[test]
    fn debounce_adopts_nonzero_immediately() {
        let mut debounce = StageDebounce::new();
        assert_eq!(debounce.observe(1, 10).as_deref(), Some("Bulk MPPT"));
        assert_eq!(debounce.observe(3, 10).as_deref(), Some("Float"));
    }

    #[test]
    fn debounce_requires_persistent_resting() {
        let mut debounce = StageDebounce::new();
        debounce.observe(1, 10);
        for _ in 0..9 {
            assert_eq!(debounce.observe(0, 10), None);
        }
        assert_eq!(debounce.observe(0, 10).as_deref(), Some("Resting"));
        // A non-zero code resets the streak entirely.
        debounce.observe(2, 10);
        assert_eq!(debounce.observe(0, 10), None);
    }

    #[test]
    fn delta_force_on_change_or_staleness() {
        let mut force = DeltaForce::new();
        let iv = Duration::seconds(30);
        assert!(force.check(100.0, 5.0, iv, t0()));
        assert!(!force.check(100.0, 5.0, iv, t0() + Duration::seconds(1)));
        assert!(!force.check(100.0, 5.0, iv, t0() + Duration::seconds(2)));
        // Large swing forces immediately.
        assert!(force.check(106.0, 5.0, iv, t0() + Duration::seconds(3)));
        // Unchanged, but past the heartbeat.
        assert!(force.check(106.0, 5.0, iv, t0() + Duration::seconds(34)));
    }
}
