//! can-link: receive-side CAN abstractions for the charge-controller bus
//!
//! The bridge only listens. This crate provides the frame model, a
//! `FrameSource` trait with a bounded-wait receive, and feature-gated
//! backends. The default build enables the `mock` backend so the bridge
//! and its tests compile on any host without native drivers.

mod types;
pub use types::{BusFrame, MAX_FRAME_ID};

mod error;
pub use error::{LinkError, Result};

mod traits;
pub use traits::FrameSource;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::MockLink;

#[cfg(feature = "slcan")]
mod slcan;

#[cfg(feature = "slcan")]
pub use slcan::{SlcanBitrate, SlcanLink};
