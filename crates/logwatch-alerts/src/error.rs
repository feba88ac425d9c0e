//! Error types for the logwatch-alerts crate.

use thiserror::Error;

/// Errors that can occur in the alerting system.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Invalid cooldown policy configuration.
    #[error("invalid cooldown policy: {reason}")]
    InvalidPolicy {
        /// The reason the policy is invalid.
        reason: String,
    },

    /// A severity string that does not name a known level.
    #[error("unknown severity: {value}")]
    UnknownSeverity {
        /// The offending severity text.
        value: String,
    },

    /// Invalid notification channel configuration.
    #[error("invalid channel configuration: {reason}")]
    InvalidChannel {
        /// The reason the channel configuration is invalid.
        reason: String,
    },

    /// Notification delivery failed.
    #[error("notification failed: {reason}")]
    NotificationFailed {
        /// The reason the notification failed.
        reason: String,
    },
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
