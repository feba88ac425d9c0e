//! Error types for the logwatch service.

use logwatch_alerts::AlertError;
use thiserror::Error;

/// Errors that can occur while configuring or running the service.
#[derive(Debug, Error)]
pub enum LogwatchError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A log record could not be decoded.
    #[error("invalid log record: {0}")]
    Decode(String),

    /// Alerting error.
    #[error(transparent)]
    Alert(#[from] AlertError),

    /// A background task failed to complete.
    #[error("task failed: {0}")]
    Task(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for LogwatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, LogwatchError>;
