//! The decoded view of one relay message.
//!
//! Every message on the general channel is a JSON object with a `"type"`
//! discriminator and an optional `"panelId"` origin tag.  All other fields are
//! kept as an opaque JSON object:
//!
//! ```json
//! {"type":"panelInfo","panelId":"left","width":800,"height":1200,"aspectRatio":0.667}
//! {"type":"frame","panelId":"center","data":"data:image/jpeg;base64,/9j/4AAQ...","timestamp":1712}
//! ```
//!
//! # Why not one enum variant per message type?
//!
//! The relay forwards messages it has never heard of (any caller-defined
//! `type` is legal), and it forwards them *byte for byte*.  The envelope is
//! only a read-only view used for diagnostics, so a struct with a free-form
//! payload is a better fit than a closed `#[serde(tag = "type")]` enum.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `type` value announcing a panel's dimensions.
pub const TYPE_PANEL_INFO: &str = "panelInfo";

/// `type` value of an inline image snapshot.
pub const TYPE_FRAME: &str = "frame";

/// `type` value used by sensor sources.
pub const TYPE_SENSOR_DATA: &str = "sensor-data";

/// `type` value of server-originated notices such as the greeting.
pub const TYPE_INFO: &str = "info";

/// Prefix every valid frame `data` field must start with.
///
/// Browsers produce `data:image/png;base64,...` or `data:image/jpeg;base64,...`
/// from `canvas.toDataURL()`.
pub const IMAGE_DATA_PREFIX: &str = "data:image";

/// Text of the greeting sent to every newly connected client.
pub const GREETING_TEXT: &str = "Connected to WebSocket server";

/// One logical relay message.
///
/// # Serde representation
///
/// `type` and `panelId` are lifted into text fields; every other key lands
/// in [`Envelope::payload`] thanks to `#[serde(flatten)]`.
///
/// Deserialization goes through [`Value`] and never rejects a well-formed
/// document: a non-string `type` or `panelId` (`7`, `true`, `{..}`) is kept
/// as its JSON text, and a non-object document becomes an untyped envelope
/// with an empty payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Envelope {
    /// The `type` discriminator.  `None` when the sender omitted it.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Origin/destination tag (`"left"`, `"center"`, `"right"`, ...).
    #[serde(rename = "panelId", skip_serializing_if = "Option::is_none")]
    pub panel_id: Option<String>,

    /// All remaining fields, untouched.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Classification of an envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind<'a> {
    /// `panelInfo`: declared width, height and aspect ratio of a panel.
    PanelInfo,
    /// `frame`: an inline base64 image snapshot.
    Frame,
    /// `sensor-data`: a sensor reading.
    SensorData,
    /// `info`: a server notice.
    Info,
    /// Any other caller-defined type, relayed opaquely.
    Other(&'a str),
    /// The sender did not include a `type` field.
    Untyped,
}

impl Envelope {
    /// Creates an envelope with the given type and an empty payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            panel_id: None,
            payload: Map::new(),
        }
    }

    /// Builds the greeting a client receives right after connecting.
    ///
    /// ```rust
    /// use relay_core::Envelope;
    ///
    /// let greeting = Envelope::greeting(3);
    /// assert_eq!(greeting.kind.as_deref(), Some("info"));
    /// assert_eq!(greeting.field("clients"), Some(&serde_json::json!(3)));
    /// ```
    pub fn greeting(clients: usize) -> Self {
        Self::new(TYPE_INFO)
            .with_field("message", Value::from(GREETING_TEXT))
            .with_field("clients", Value::from(clients))
    }

    /// Adds (or replaces) one payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Returns a payload field by name.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Classifies the `type` field.
    pub fn message_kind(&self) -> MessageKind<'_> {
        match self.kind.as_deref() {
            None => MessageKind::Untyped,
            Some(TYPE_PANEL_INFO) => MessageKind::PanelInfo,
            Some(TYPE_FRAME) => MessageKind::Frame,
            Some(TYPE_SENSOR_DATA) => MessageKind::SensorData,
            Some(TYPE_INFO) => MessageKind::Info,
            Some(other) => MessageKind::Other(other),
        }
    }
}

impl From<Value> for Envelope {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut payload) => Self {
                kind: payload.remove("type").and_then(text_view),
                panel_id: payload.remove("panelId").and_then(text_view),
                payload,
            },
            _ => Self {
                kind: None,
                panel_id: None,
                payload: Map::new(),
            },
        }
    }
}

/// Strings as-is, `null` as absent, anything else as its JSON text.
fn text_view(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

// ── Frame image check ─────────────────────────────────────────────────────────

/// Result of inspecting the `data` field of a `frame` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCheck {
    /// `true` when `data` is a non-empty string starting with [`IMAGE_DATA_PREFIX`].
    pub has_valid_image: bool,
    /// Length of the `data` string in bytes (0 when absent or not a string).
    pub data_len: usize,
}

impl FrameCheck {
    /// Approximate payload size in KiB.
    pub fn size_kb(&self) -> f64 {
        self.data_len as f64 / 1024.0
    }
}

/// Inspects the image payload of an envelope.
///
/// Never fails: a missing or malformed `data` field simply yields
/// `has_valid_image == false`.  The relay flags such frames but still
/// forwards them.
pub fn check_frame(envelope: &Envelope) -> FrameCheck {
    match envelope.field("data") {
        Some(Value::String(data)) => FrameCheck {
            has_valid_image: data.starts_with(IMAGE_DATA_PREFIX),
            data_len: data.len(),
        },
        _ => FrameCheck {
            has_valid_image: false,
            data_len: 0,
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
