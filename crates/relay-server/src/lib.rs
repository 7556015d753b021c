//! relay-server library crate.
//!
//! This crate provides a WebSocket fan-out relay: every message a client
//! sends is forwarded, byte for byte, to every *other* client on the same
//! channel.  Browser panels use it to mirror frames between screens; sensor
//! clients use a separate channel for their events.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Clients (JSON over WebSocket)
//!         ↕
//! [relay-server]
//!   ├── domain/           Pure types: RelayConfig, ConnectionId, errors
//!   ├── application/      Registry, broadcast, per-frame pipeline, stats
//!   └── infrastructure/
//!         ├── http/       Router, CORS, GET /status (axum)
//!         └── ws_server/  Listener, WebSocket sessions, stats timer
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async code.
//! - `application` depends on `domain` and `relay-core`; it touches no socket.
//! - `infrastructure` depends on all other layers plus `tokio` and `axum`.
//!
//! # For beginners: why this structure?
//!
//! The interesting behaviour (who gets which frame, what happens when a
//! client is slow or gone) lives in the application layer and is tested with
//! plain queues instead of sockets.  The infrastructure layer only moves
//! bytes between those queues and the network.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: registry, relay pipeline and stats.
pub mod application;

/// Infrastructure layer: HTTP router and WebSocket server.
pub mod infrastructure;
