//! Sensor-channel payloads.
//!
//! Sensor sources (depth cameras, proximity sensors, ...) send small JSON
//! readings on their own channel.  Two encodings are seen in practice:
//!
//! ```text
//! {"sensor":"kinect","x":0.42}          ← a JSON object, sent directly
//! "{\"sensor\":\"kinect\",\"x\":0.42}"  ← the same object, JSON-encoded twice
//! ```
//!
//! The second form comes from clients that call `JSON.stringify` before
//! handing the payload to a library that serializes again.  [`parse_sensor_event`]
//! unwraps one level of such nesting so every receiver sees the same shape.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::codec::{excerpt, EncodeError};

/// Errors returned by [`parse_sensor_event`].
///
/// A sensor error affects exactly one event: the caller logs it and drops
/// that event without touching the connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SensorError {
    /// The payload is not JSON at all.
    #[error("malformed sensor event: {reason}; message start: {excerpt:?}")]
    Malformed { reason: String, excerpt: String },

    /// The payload is a JSON string, but its contents are not JSON.
    #[error("malformed nested sensor event: {reason}; message start: {excerpt:?}")]
    NestedMalformed { reason: String, excerpt: String },
}

/// One parsed sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    value: Value,
    nested: bool,
}

impl SensorEvent {
    /// The structured reading.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// `true` when the reading arrived as a JSON-encoded string.
    pub fn was_nested(&self) -> bool {
        self.nested
    }

    /// Compact JSON text forwarded to the other sensor-channel clients.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the value cannot be serialized.
    pub fn to_wire(&self) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(&self.value)?)
    }

    /// Short description for debug logging.
    pub fn summary(&self) -> String {
        match &self.value {
            Value::Object(map) => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                format!("object {{{}}}", keys.join(", "))
            }
            Value::Array(items) => format!("array of {}", items.len()),
            other => other.to_string(),
        }
    }
}

/// Parses one sensor-channel payload, unwrapping a JSON-encoded string once.
///
/// # Errors
///
/// - [`SensorError::Malformed`] when `raw` is not JSON.
/// - [`SensorError::NestedMalformed`] when `raw` is a JSON string whose
///   contents fail to parse.
///
/// # Examples
///
/// ```rust
/// use relay_core::parse_sensor_event;
///
/// let direct = parse_sensor_event(br#"{"x":1}"#).unwrap();
/// let nested = parse_sensor_event(br#""{\"x\":1}""#).unwrap();
/// assert_eq!(direct.value(), nested.value());
/// assert!(nested.was_nested());
/// ```
pub fn parse_sensor_event(raw: &[u8]) -> Result<SensorEvent, SensorError> {
    let value: Value = serde_json::from_slice(raw).map_err(|e| SensorError::Malformed {
        reason: e.to_string(),
        excerpt: excerpt(raw),
    })?;

    match value {
        Value::String(inner) => {
            let nested: Value =
                serde_json::from_str(&inner).map_err(|e| SensorError::NestedMalformed {
                    reason: e.to_string(),
                    excerpt: excerpt(inner.as_bytes()),
                })?;
            Ok(SensorEvent {
                value: nested,
                nested: true,
            })
        }
        value => Ok(SensorEvent {
            value,
            nested: false,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
