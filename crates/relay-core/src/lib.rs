//! # relay-core
//!
//! Shared protocol library for the panel relay: the JSON envelope model, the
//! decoder/encoder, the diagnostics classifier, and the sensor-event parser.
//!
//! This crate has no dependencies on sockets, async runtimes, or logging.  It
//! turns bytes into typed values (or typed errors) and back, and nothing else.
//!
//! # Architecture overview (for beginners)
//!
//! The relay server sits between several browser panels (left, center, right)
//! and external sensor/camera clients.  Every client sends JSON objects with a
//! `"type"` field; the server forwards each one to every *other* connected
//! client.  The server never rewrites what it forwards: it only *looks* at the
//! message so it can log something useful about it.
//!
//! That is why this crate is split the way it is:
//!
//! - **`protocol::envelope`** – The decoded view of one message
//!   ([`Envelope`]) and the frame-image check.
//! - **`protocol::codec`** – [`decode`] raw bytes into an [`Envelope`] and
//!   [`encode`] server-originated envelopes (such as the greeting).
//! - **`protocol::classify`** – Derive a one-line [`LogHint`] per message.
//! - **`protocol::sensor`** – Parse the payloads of the sensor channel,
//!   including the "JSON string containing JSON" form some sensors send.

pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `relay_core::decode` instead of `relay_core::protocol::codec::decode`.
pub use protocol::classify::{classify, LogHint, Severity};
pub use protocol::codec::{decode, encode, encode_text, DecodeError, EncodeError};
pub use protocol::envelope::{check_frame, Envelope, FrameCheck, MessageKind};
pub use protocol::sensor::{parse_sensor_event, SensorError, SensorEvent};
