use crate::{BusFrame, FrameSource, Result};
use std::collections::VecDeque;
use std::time::Duration;
use time::OffsetDateTime;

/// In-process backend fed by tests or demos. `recv` drains the scripted
/// queue and reports an idle tick once it is empty.
pub struct MockLink {
    name: String,
    queue: VecDeque<BusFrame>,
}

impl MockLink {
    pub fn push(&mut self, mut frame: BusFrame) {
        if frame.timestamp.is_none() {
            frame.timestamp = Some(OffsetDateTime::now_utc());
        }
        self.queue.push_back(frame);
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FrameSource for MockLink {
    fn open(name: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            queue: VecDeque::new(),
        })
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<BusFrame>> {
        match self.queue.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => {
                // Honor the bounded wait so an idle loop still paces itself.
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}
