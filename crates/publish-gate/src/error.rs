use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("timestamp formatting failed: {0}")]
    TimestampFormat(#[from] time::error::Format),
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
