//! Infrastructure layer for relay-server.
//!
//! The infrastructure layer handles all I/O: binding the listener, serving
//! HTTP routes, and driving WebSocket sessions.
//!
//! # Responsibilities
//!
//! - Binding one TCP listener for every route
//! - Routing `/`, `/ws`, `/sensor` and `/status`, with permissive CORS
//! - Performing the WebSocket upgrade with the configured size limits
//! - Spawning the per-session reader/writer halves
//! - Running the periodic stats timer
//! - Stopping on the shutdown signal
//!
//! # What does NOT belong here?
//!
//! - Decoding or classifying messages (that is `relay-core`)
//! - Deciding who receives a frame (that is the application layer)
//! - Configuration parsing (that is done in `main.rs`)

pub mod http;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use http::{router, AppState};
pub use ws_server::{run_server, RelayServer};
