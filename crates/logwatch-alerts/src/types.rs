//! Core types for the alerting system.
//!
//! This module provides the fundamental types used throughout the logwatch-alerts crate:
//! - [`Severity`]: The severity level of a log record
//! - [`LogEvent`]: A classified log record handed to the throttler
//! - [`SignalKey`]: The de-duplication key for a class of recurring problem
//! - [`AlertPayload`]: The flattened alert handed to notification channels

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AlertError;

/// The severity level of a log record.
///
/// Ordered from least to most urgent, so `Severity::Error > Severity::Info`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Diagnostic output.
    Debug,
    /// Routine information.
    #[default]
    Info,
    /// Something unexpected that did not fail.
    Warning,
    /// A failed operation.
    Error,
    /// A failure that needs immediate attention.
    Critical,
}

impl Severity {
    /// All severities, least urgent first.
    pub const ALL: [Self; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];

    /// Returns the severity as its canonical upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Returns true if records of this severity may raise an alert.
    #[must_use]
    pub const fn is_alertable(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(AlertError::UnknownSeverity {
                value: s.to_string(),
            }),
        }
    }
}

/// A log record after classification, as seen by the throttler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Severity of the record.
    pub severity: Severity,
    /// Message text, compared verbatim when deriving the signal key.
    pub message: String,
    /// Where the record came from (service, resource type, ...).
    pub source: String,
    /// When the record was produced.
    pub observed_at: DateTime<Utc>,
}

impl LogEvent {
    /// Creates an event observed now.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            source: source.into(),
            observed_at: Utc::now(),
        }
    }

    /// Sets the observation time.
    #[must_use]
    pub const fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Derives the signal key for this event.
    #[must_use]
    pub fn signal_key(&self) -> SignalKey {
        SignalKey::new(self.severity, &self.message)
    }

    /// Flattens this event into the payload handed to notification channels.
    #[must_use]
    pub fn to_payload(&self) -> AlertPayload {
        AlertPayload::from(self)
    }
}

/// Identity used to group recurring problems for throttling.
///
/// Derived from severity and the exact message text. No normalization is
/// applied, so messages differing by a single character are distinct signals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalKey(String);

impl SignalKey {
    /// Builds the key for a severity and message.
    #[must_use]
    pub fn new(severity: Severity, message: &str) -> Self {
        Self(format!("{}_{message}", severity.as_str()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The alert handed to notification channels when a signal fires.
///
/// All fields are plain strings so channels never need to know about the
/// throttler's types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Severity name, e.g. `ERROR`.
    pub severity: String,
    /// The log message.
    pub message: String,
    /// Where the record came from.
    pub source: String,
    /// RFC 3339 observation time.
    pub timestamp: String,
}

impl From<&LogEvent> for AlertPayload {
    fn from(event: &LogEvent) -> Self {
        Self {
            severity: event.severity.as_str().to_string(),
            message: event.message.clone(),
            source: event.source.clone(),
            timestamp: event.observed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    mod severity_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn severity_as_str() {
            assert_eq!(Severity::Debug.as_str(), "DEBUG");
            assert_eq!(Severity::Info.as_str(), "INFO");
            assert_eq!(Severity::Warning.as_str(), "WARNING");
            assert_eq!(Severity::Error.as_str(), "ERROR");
            assert_eq!(Severity::Critical.as_str(), "CRITICAL");
        }

        #[test]
        fn severity_ordering() {
            assert!(Severity::Debug < Severity::Info);
            assert!(Severity::Info < Severity::Warning);
            assert!(Severity::Warning < Severity::Error);
            assert!(Severity::Error < Severity::Critical);
        }

        #[test]
        fn only_error_and_critical_are_alertable() {
            let alertable: Vec<_> = Severity::ALL
                .iter()
                .filter(|s| s.is_alertable())
                .copied()
                .collect();
            assert_eq!(alertable, vec![Severity::Error, Severity::Critical]);
        }

        #[test_case("ERROR", Severity::Error ; "upper case")]
        #[test_case("error", Severity::Error ; "lower case")]
        #[test_case(" Critical ", Severity::Critical ; "padded mixed case")]
        #[test_case("WARN", Severity::Warning ; "warn alias")]
        #[test_case("warning", Severity::Warning ; "warning")]
        #[test_case("DEBUG", Severity::Debug ; "debug")]
        #[test_case("Info", Severity::Info ; "info")]
        fn severity_parse(input: &str, expected: Severity) {
            assert_eq!(input.parse::<Severity>().unwrap(), expected);
        }

        #[test_case("UNKNOWN" ; "placeholder")]
        #[test_case("" ; "empty")]
        #[test_case("FATAL" ; "unsupported level")]
        fn severity_parse_rejects(input: &str) {
            let err = input.parse::<Severity>().unwrap_err();
            assert!(matches!(err, AlertError::UnknownSeverity { .. }));
        }

        #[test]
        fn severity_serializes_upper_case() {
            let json = serde_json::to_string(&Severity::Critical).unwrap();
            assert_eq!(json, "\"CRITICAL\"");
            let parsed: Severity = serde_json::from_str("\"WARNING\"").unwrap();
            assert_eq!(parsed, Severity::Warning);
        }
    }

    mod signal_key_tests {
        use super::*;

        #[test]
        fn same_severity_and_message_same_key() {
            let a = LogEvent::new(Severity::Error, "DB down", "api");
            let b = LogEvent::new(Severity::Error, "DB down", "worker");
            assert_eq!(a.signal_key(), b.signal_key());
        }

        #[test]
        fn key_is_case_and_whitespace_sensitive() {
            let base = SignalKey::new(Severity::Error, "DB down");
            assert_ne!(base, SignalKey::new(Severity::Error, "db down"));
            assert_ne!(base, SignalKey::new(Severity::Error, "DB down "));
            assert_ne!(base, SignalKey::new(Severity::Error, "DB  down"));
        }

        #[test]
        fn severity_is_part_of_key() {
            assert_ne!(
                SignalKey::new(Severity::Error, "DB down"),
                SignalKey::new(Severity::Critical, "DB down")
            );
        }

        #[test]
        fn key_display() {
            let key = SignalKey::new(Severity::Error, "DB down");
            assert_eq!(key.to_string(), "ERROR_DB down");
            assert_eq!(key.as_str(), "ERROR_DB down");
        }
    }

    mod payload_tests {
        use super::*;

        #[test]
        fn payload_from_event() {
            let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
            let event =
                LogEvent::new(Severity::Critical, "Payment failed", "billing").with_observed_at(at);

            let payload = event.to_payload();

            assert_eq!(payload.severity, "CRITICAL");
            assert_eq!(payload.message, "Payment failed");
            assert_eq!(payload.source, "billing");
            assert_eq!(payload.timestamp, "2024-05-01T12:30:00Z");
        }

        #[test]
        fn payload_serializes_flat() {
            let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
            let payload = LogEvent::new(Severity::Error, "DB down", "api")
                .with_observed_at(at)
                .to_payload();

            let value = serde_json::to_value(&payload).unwrap();
            assert_eq!(value["severity"], "ERROR");
            assert_eq!(value["source"], "api");
            assert_eq!(value["timestamp"], "2024-05-01T12:30:00Z");
        }
    }
}
