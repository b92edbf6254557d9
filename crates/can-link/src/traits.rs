use crate::{BusFrame, Result};
use std::time::Duration;

/// Receive side of a CAN interface.
pub trait FrameSource {
    /// Open an interface by name (e.g. "can0", "/dev/ttyACM0", "mock0").
    fn open(name: &str) -> Result<Self>
    where
        Self: Sized;

    /// Wait up to `timeout` for one frame. `Ok(None)` means the wait
    /// elapsed with no traffic; callers treat that as a normal idle tick
    /// and carry on with their periodic work.
    fn recv(&mut self, timeout: Duration) -> Result<Option<BusFrame>>;
}
