use crate::MetricValue;
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};

struct TopicState {
    last_value: MetricValue,
    last_at: OffsetDateTime,
}

/// Per-topic publish admission: a value passes when it moved by at least
/// the topic's threshold or when the heartbeat interval elapsed. State is
/// created lazily on a topic's first admission check and kept for the
/// life of the process.
#[derive(Default)]
pub struct ThrottleGate {
    topics: HashMap<String, TopicState>,
}

impl ThrottleGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admission check with side effect: an admitted value becomes the new
    /// comparison point for its topic. A topic with no prior value always
    /// admits; there is no numeric sentinel.
    pub fn admit(
        &mut self,
        topic: &str,
        value: &MetricValue,
        threshold: f64,
        min_interval: Duration,
        now: OffsetDateTime,
    ) -> bool {
        let due = match self.topics.get(topic) {
            None => true,
            Some(prev) => {
                let heartbeat = now - prev.last_at >= min_interval;
                match (&prev.last_value, value) {
                    (MetricValue::Numeric(last), MetricValue::Numeric(new)) => {
                        (new - last).abs() >= threshold || heartbeat
                    }
                    // Text (or a kind change): publish on any change.
                    (last, new) => last != new || heartbeat,
                }
            }
        };
        if due {
            self.topics.insert(
                topic.to_string(),
                TopicState {
                    last_value: value.clone(),
                    last_at: now,
                },
            );
        }
        due
    }
}
