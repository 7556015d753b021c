//! JSON codec for relay envelopes.
//!
//! Wire format: one UTF-8 JSON object per WebSocket message.
//!
//! # Decode, but never re-encode, relayed traffic
//!
//! Frame messages carry base64 images that are often several hundred KiB.
//! The relay decodes every inbound message to *inspect* it, but forwards the
//! original bytes untouched.  [`encode`] is therefore only used for messages
//! the server writes itself (the greeting and re-broadcast sensor events).

use thiserror::Error;

use crate::protocol::envelope::Envelope;

/// Number of raw bytes kept in a [`DecodeError`] for diagnostics.
pub const EXCERPT_LEN: usize = 100;

/// Errors returned by [`decode`].
///
/// Only input that is not well-formed JSON is an error.  Any well-formed
/// value, whatever its shape, decodes to an [`Envelope`] and is relayed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The bytes are not well-formed JSON (syntax error or truncated input).
    ///
    /// Carries the first [`EXCERPT_LEN`] bytes of the offending input so the
    /// log line shows what the sender actually sent.
    #[error("malformed JSON: {reason}; message start: {excerpt:?}")]
    Malformed { reason: String, excerpt: String },
}

impl DecodeError {
    /// The leading bytes of the rejected input.
    pub fn excerpt(&self) -> &str {
        match self {
            DecodeError::Malformed { excerpt, .. } => excerpt,
        }
    }
}

/// Error returned by [`encode`].
#[derive(Debug, Error)]
#[error("failed to encode envelope: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one raw message into an [`Envelope`].
///
/// Never panics: callers always receive either an envelope or an explicit
/// [`DecodeError`].
///
/// Lenient about shape: a non-string `type` or `panelId` is rendered as
/// text, and a JSON value that is not an object yields an untyped envelope
/// with an empty payload.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for syntax errors and truncated input.
///
/// # Examples
///
/// ```rust
/// use relay_core::{decode, MessageKind};
///
/// let envelope = decode(br#"{"type":"frame","panelId":"left","data":"data:image/png;base64,AA"}"#).unwrap();
/// assert_eq!(envelope.message_kind(), MessageKind::Frame);
///
/// let err = decode(b"{not json").unwrap_err();
/// assert_eq!(err.excerpt(), "{not json");
/// ```
pub fn decode(raw: &[u8]) -> Result<Envelope, DecodeError> {
    serde_json::from_slice::<Envelope>(raw).map_err(|e| DecodeError::Malformed {
        reason: e.to_string(),
        excerpt: excerpt(raw),
    })
}

/// Serializes an envelope to its JSON wire bytes.
///
/// # Errors
///
/// Returns [`EncodeError`] if serialization fails (which can only happen for
/// payload values `serde_json` cannot represent).
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(envelope)?)
}

/// Like [`encode`], but returns the JSON as a `String` for text frames.
///
/// # Errors
///
/// Same as [`encode`].
pub fn encode_text(envelope: &Envelope) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Returns the first [`EXCERPT_LEN`] bytes of `raw` as text.
///
/// Invalid UTF-8 (including a multi-byte character cut in half at the
/// boundary) is replaced with U+FFFD rather than rejected.
pub fn excerpt(raw: &[u8]) -> String {
    let end = raw.len().min(EXCERPT_LEN);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
