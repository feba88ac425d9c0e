//! Decoding of incoming log records.
//!
//! Records arrive as one JSON object per line, in any of these shapes:
//!
//! - a Cloud Logging entry (`severity`, `textPayload`, `timestamp`, `resource.type`)
//! - a plain record (`severity`, `message`, `timestamp`, `source`, `labels.source`)
//! - a Pub/Sub push envelope `{"message": {"data": "<base64>"}}` wrapping either
//! - a Pub/Sub background event `{"data": "<base64>"}` wrapping either

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use logwatch_alerts::{LogEvent, Severity};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{LogwatchError, Result};

const DEFAULT_MESSAGE: &str = "No message";
const DEFAULT_SOURCE: &str = "unknown";
const MISSING_SEVERITY: &str = "UNKNOWN";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    severity: Option<String>,
    text_payload: Option<String>,
    message: Option<String>,
    timestamp: Option<String>,
    source: Option<String>,
    resource: Option<Resource>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct Resource {
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl RawRecord {
    fn into_event(self, received_at: DateTime<Utc>) -> Result<LogEvent> {
        let severity: Severity = self
            .severity
            .as_deref()
            .unwrap_or(MISSING_SEVERITY)
            .parse()?;

        let message = non_empty(self.text_payload)
            .or_else(|| non_empty(self.message))
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

        let mut labels = self.labels;
        let source = non_empty(labels.remove("source"))
            .or_else(|| non_empty(self.source))
            .or_else(|| non_empty(self.resource.and_then(|r| r.kind)))
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        let observed_at = self
            .timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map_or(received_at, |ts| ts.with_timezone(&Utc));

        Ok(LogEvent {
            severity,
            message,
            source,
            observed_at,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Unwraps a Pub/Sub envelope, returning the inner record.
///
/// Values that are not envelopes are returned unchanged.
fn unwrap_envelope(value: Value) -> Result<Value> {
    let data = match (&value["message"]["data"], &value["data"]) {
        (Value::Null, Value::Null) => return Ok(value),
        (Value::Null, data) if value.get("severity").is_none() => data,
        (Value::Null, _) => return Ok(value),
        (data, _) => data,
    };

    let encoded = data
        .as_str()
        .ok_or_else(|| LogwatchError::Decode("envelope data must be a string".to_string()))?;
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| LogwatchError::Decode(format!("envelope data is not base64: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| LogwatchError::Decode(format!("envelope data is not UTF-8: {e}")))?;

    Ok(serde_json::from_str(&text)?)
}

/// Decodes one JSON line into a [`LogEvent`].
///
/// `received_at` stands in for records without a parseable timestamp.
///
/// # Errors
///
/// Returns `LogwatchError::Decode` for malformed JSON or envelopes and
/// `LogwatchError::Alert` for a missing or unknown severity.
pub fn decode_record(line: &str, received_at: DateTime<Utc>) -> Result<LogEvent> {
    let value: Value = serde_json::from_str(line)?;
    if !value.is_object() {
        return Err(LogwatchError::Decode(
            "log record must be a JSON object".to_string(),
        ));
    }

    let raw: RawRecord = serde_json::from_value(unwrap_envelope(value)?)?;
    raw.into_event(received_at)
}
