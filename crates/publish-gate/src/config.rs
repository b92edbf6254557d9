use time::Duration;

/// Per-topic change thresholds. These are configuration, not code: the
/// generic throttle rule is the same for every topic.
#[derive(Clone, Debug)]
pub struct Thresholds {
    pub pv_voltage: f64,
    pub daily_kwh: f64,
    pub shunt_amps: f64,
    pub battery_voltage: f64,
    pub battery_current: f64,
    pub temperature: f64,
    pub ac_line_voltage: f64,
    pub ac_input_voltage: f64,
    pub ac_input_amps: f64,
    pub ac_input_hz: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pv_voltage: 1.0,
            daily_kwh: 0.01,
            shunt_amps: 0.1,
            battery_voltage: 0.5,
            battery_current: 0.5,
            temperature: 1.0,
            ac_line_voltage: 0.5,
            ac_input_voltage: 1.0,
            ac_input_amps: 0.5,
            ac_input_hz: 0.1,
        }
    }
}

/// Filter tuning, heartbeats and snapshot cadence.
#[derive(Clone, Debug)]
pub struct GateConfig {
    pub thresholds: Thresholds,
    /// Heartbeat for throttled topics: even an unchanged value goes out
    /// once this much time has passed.
    pub min_interval: Duration,
    /// Forced-delta gate for battery power and the AC watt metrics.
    pub force_threshold: f64,
    pub force_interval: Duration,
    /// Battery power above this counts as "was producing" for the
    /// zero-dropout filter.
    pub producing_floor: f64,
    /// Consecutive zero-power readings suppressed before a real shutdown
    /// is let through.
    pub max_zero_drops: u32,
    /// Consecutive zero stage codes before "Resting" is adopted.
    pub resting_debounce: u32,
    /// Cadence of the consolidated `state` publish.
    pub snapshot_interval: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            min_interval: Duration::seconds(5),
            force_threshold: 5.0,
            force_interval: Duration::seconds(30),
            producing_floor: 10.0,
            max_zero_drops: 15,
            resting_debounce: 10,
            snapshot_interval: Duration::seconds(10),
        }
    }
}
