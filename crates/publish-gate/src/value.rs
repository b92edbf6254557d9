/// A decoded reading on its way to one topic.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    Numeric(f64),
    Text(String),
}

impl MetricValue {
    /// Wire payload: decimal text for numbers, the string itself for text.
    pub fn render(&self) -> String {
        match self {
            MetricValue::Numeric(v) => format!("{v}"),
            MetricValue::Text(s) => s.clone(),
        }
    }
}

/// One admitted publish decision. The broker shell owns topic prefixing
/// and delivery; the engine's responsibility ends here.
#[derive(Clone, Debug, PartialEq)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_payloads_render_as_decimal_text() {
        assert_eq!(MetricValue::Numeric(20.1).render(), "20.1");
        assert_eq!(MetricValue::Numeric(500.0).render(), "500");
        assert_eq!(MetricValue::Numeric(-12.3).render(), "-12.3");
        assert_eq!(MetricValue::Text("Bulk MPPT".into()).render(), "Bulk MPPT");
    }
}
