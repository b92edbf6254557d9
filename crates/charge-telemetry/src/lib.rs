//! charge-telemetry: frame routing and register decoding for the solar
//! charge-controller bus.
//!
//! Decoders are pure functions from payload bytes to typed readings. The
//! router guards each decoder with its minimum length requirement, so the
//! decoders themselves never see a short frame. Implausible values are
//! filtered here, not treated as errors: the bus is shared and noisy.

mod types;
pub use types::{is_producing_stage, stage_name, DecodeParams, Reading, RESTING_STAGE};

mod registers;
pub use registers::*;

mod decode;
