//! Domain layer for relay-server.
//!
//! The domain layer contains plain types with no dependencies on sockets,
//! async runtimes, or HTTP frameworks: configuration, connection identity and
//! lifecycle, and the error taxonomy.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `axum`, or `WebSocket` types
//! - Environment variable or CLI reading (that is done in `main.rs`)
//! - Shared mutable state (that is the application layer's registry)

pub mod config;
pub mod connection;
pub mod error;

pub use config::RelayConfig;
pub use connection::{Channel, ConnectionId, ConnectionState};
pub use error::{AdmitError, ConfigError, DeliveryError, FrameError};
