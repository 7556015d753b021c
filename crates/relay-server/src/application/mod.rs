//! Application layer for relay-server.
//!
//! The application layer owns the shared relay state and decides what happens
//! to each inbound frame.  It knows *what* to do, but leaves sockets and
//! task spawning to the infrastructure layer.
//!
//! # Responsibilities
//!
//! - Tracking live connections per channel ([`Registry`])
//! - Decoding, classifying and relaying each inbound frame ([`RelayService`])
//! - Fan-out with per-recipient failure isolation ([`broadcast`])
//! - Message throughput counters and the `/status` report ([`StatsReporter`])
//!
//! # What does NOT belong here?
//!
//! - Binding listeners or accepting WebSocket upgrades (that is infrastructure)
//! - Reading or writing sockets (the session tasks do that)
//! - CLI and environment parsing (that is done in `main.rs`)

pub mod broadcast;
pub mod connection;
pub mod registry;
pub mod relay_service;
pub mod stats;

pub use broadcast::{broadcast, BroadcastReport};
pub use connection::Connection;
pub use registry::Registry;
pub use relay_service::RelayService;
pub use stats::{ChannelCounts, StatsReporter, StatsSummary, StatusReport};
