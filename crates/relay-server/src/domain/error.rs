//! Error taxonomy of the relay.
//!
//! Each error is contained at the smallest possible scope:
//!
//! | Error            | Scope            | Effect                                |
//! |------------------|------------------|---------------------------------------|
//! | [`FrameError`]   | one inbound frame| logged; the receive loop continues    |
//! | [`DeliveryError`]| one recipient    | logged; other recipients still served |
//! | connection error | one connection   | its session ends and it is deregistered |
//! | [`ConfigError`] / bind failure | process | fatal, non-zero exit      |
//!
//! Nothing is ever reported back to the sender over the wire.

use relay_core::{DecodeError, EncodeError, SensorError};
use thiserror::Error;

/// Failure to hand one frame to one recipient.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient's outbound queue is full (it is reading too slowly).
    #[error("outbound queue full")]
    QueueFull,

    /// The recipient's writer has stopped; the connection is going away.
    #[error("connection closed")]
    Closed,
}

/// Failure to process one inbound frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The frame is larger than the configured per-message limit.
    #[error("message of {size} bytes exceeds the {limit}-byte limit")]
    Oversized { size: usize, limit: usize },
}

/// Failure to admit a new connection (register it and queue its greeting).
///
/// On error the connection has not been left in the registry.
#[derive(Debug, Error)]
pub enum AdmitError {
    #[error("failed to encode greeting: {0}")]
    Encode(#[from] EncodeError),

    #[error("failed to queue greeting: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Invalid runtime configuration.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("stats interval must be greater than zero")]
    ZeroStatsInterval,

    #[error("maximum message size must be greater than zero")]
    ZeroMessageSize,

    #[error("outbound queue capacity must be greater than zero")]
    ZeroOutboundQueue,
}
