//! publish-gate: the decode→filter→publish engine.
//!
//! Turns decoded readings into `(topic, payload, retain)` publish
//! decisions: a generic per-topic throttle, the battery-power zero-dropout
//! filter, the charge-stage debounce, forced-delta publishes for the
//! high-value watt metrics, and a periodic consolidated snapshot. All
//! state lives in constructible objects and every method takes the current
//! time as a parameter, so behavior is reproducible under test.

mod value;
pub use value::{MetricValue, Publication};

mod error;
pub use error::GateError;

mod config;
pub use config::{GateConfig, Thresholds};

mod throttle;
pub use throttle::ThrottleGate;

mod filters;
pub use filters::{DeltaForce, StageDebounce, ZeroDropout};

mod snapshot;
pub use snapshot::{
    BatteryState, DailyState, InverterState, PvState, ShuntState, StateSnapshot,
};

mod engine;
pub use engine::BridgeEngine;
