//! Per-message diagnostics.
//!
//! [`classify`] turns a decoded [`Envelope`] into a single human-readable log
//! line plus a [`Severity`].  The server decides *where* the line goes; this
//! module only decides *what* it says.
//!
//! Frames arrive at up to 30 per second per panel, so a valid frame is
//! reported at [`Severity::Debug`] to keep the default log readable, while an
//! invalid one is promoted to [`Severity::Warn`].

use std::fmt;

use serde_json::Value;

use crate::protocol::envelope::{check_frame, Envelope, MessageKind};

/// Placeholder used when a panel id, type, or dimension is absent.
const UNKNOWN: &str = "unknown";

/// How loudly a [`LogHint`] should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// High-frequency, healthy traffic.
    Debug,
    /// Noteworthy but healthy traffic.
    Info,
    /// Structurally valid but semantically suspect traffic.  Still relayed.
    Warn,
}

/// A diagnostic line derived from one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHint {
    pub severity: Severity,
    pub line: String,
}

impl fmt::Display for LogHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Derives the diagnostic line for an envelope.
///
/// | `type`       | Line                                                   |
/// |--------------|--------------------------------------------------------|
/// | `frame`      | `Frame from left: valid image, 12.5KB`                 |
/// | `panelInfo`  | `Panel info for left: 800x1200 (0.667)`                |
/// | anything else| `Message: <type> from panel <panelId>`                 |
///
/// # Examples
///
/// ```rust
/// use relay_core::{classify, decode, Severity};
///
/// let envelope = decode(br#"{"type":"frame","panelId":"left","data":"oops"}"#).unwrap();
/// let hint = classify(&envelope);
/// assert_eq!(hint.severity, Severity::Warn);
/// assert_eq!(hint.line, "Frame from left: INVALID image, 0.0KB");
/// ```
pub fn classify(envelope: &Envelope) -> LogHint {
    let panel = envelope.panel_id.as_deref().unwrap_or(UNKNOWN);

    match envelope.message_kind() {
        MessageKind::Frame => {
            let check = check_frame(envelope);
            LogHint {
                severity: if check.has_valid_image {
                    Severity::Debug
                } else {
                    Severity::Warn
                },
                line: format!(
                    "Frame from {panel}: {} image, {:.1}KB",
                    if check.has_valid_image { "valid" } else { "INVALID" },
                    check.size_kb()
                ),
            }
        }
        MessageKind::PanelInfo => LogHint {
            severity: Severity::Info,
            line: format!(
                "Panel info for {panel}: {}x{} ({})",
                field_text(envelope, "width"),
                field_text(envelope, "height"),
                field_text(envelope, "aspectRatio"),
            ),
        },
        kind => {
            let type_name = match kind {
                MessageKind::SensorData => "sensor-data",
                MessageKind::Info => "info",
                MessageKind::Other(name) => name,
                _ => UNKNOWN,
            };
            LogHint {
                severity: Severity::Info,
                line: format!("Message: {type_name} from panel {panel}"),
            }
        }
    }
}

/// Renders a payload field for a log line: strings without quotes, other
/// JSON values as-is, and [`UNKNOWN`] when absent.
fn field_text(envelope: &Envelope, key: &str) -> String {
    match envelope.field(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => UNKNOWN.to_string(),
        Some(other) => other.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
