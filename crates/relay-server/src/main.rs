//! Panel relay server: entry point.
//!
//! This binary accepts WebSocket connections from browser panels and sensor
//! clients and forwards every message it receives to all *other* connected
//! clients on the same channel.  It never answers a sender and never keeps
//! anything beyond the set of live connections.
//!
//! # Usage
//!
//! ```text
//! relay-server [OPTIONS]
//!
//! Options:
//!   --port             <PORT>   Listener port [default: 8080]
//!   --bind             <ADDR>   Listener IP address [default: 0.0.0.0]
//!   --stats-interval   <SECS>   Stats window length [default: 5]
//!   --max-message-size <BYTES>  Largest accepted message [default: 16777216]
//!   --outbound-queue   <FRAMES> Frames buffered per recipient [default: 64]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable                 | Default    | Description                  |
//! |--------------------------|------------|------------------------------|
//! | `PORT`                   | `8080`     | Listener port                |
//! | `RELAY_BIND`             | `0.0.0.0`  | Listener IP address          |
//! | `RELAY_STATS_INTERVAL`   | `5`        | Stats window (secs)          |
//! | `RELAY_MAX_MESSAGE_SIZE` | `16777216` | Largest accepted message     |
//! | `RELAY_OUTBOUND_QUEUE`   | `64`       | Frames buffered per recipient|
//! | `RUST_LOG`               | `info`     | Log filter                   |
//!
//! # Architecture overview
//!
//! ```text
//! Browser panels (left / center / right)      Sensor clients
//!        ↕  ws://host:PORT/ or /ws                 ↕  ws://host:PORT/sensor
//! relay-server  ← this process
//!   domain/          RelayConfig, ConnectionId, error taxonomy
//!   application/     Registry, broadcast, RelayService, stats
//!   infrastructure/
//!     http/          Router, CORS, GET /status
//!     ws_server/     Listener, per-session reader/writer, stats timer
//! ```

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use relay_server::domain::config::{
    DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_OUTBOUND_QUEUE, DEFAULT_PORT,
};
use relay_server::domain::RelayConfig;
use relay_server::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Real-time WebSocket relay for multi-panel frame mirroring.
///
/// Forwards every message a client sends to all other connected clients.
#[derive(Debug, Parser)]
#[command(
    name = "relay-server",
    about = "WebSocket fan-out relay for multi-panel frame mirroring and sensor events",
    version
)]
struct Cli {
    /// TCP port for the HTTP/WebSocket listener.
    #[arg(long, default_value_t = DEFAULT_PORT, env = "PORT")]
    port: u16,

    /// IP address to bind the listener to.
    ///
    /// Use `0.0.0.0` to accept connections from any interface, or `127.0.0.1`
    /// to accept only local connections.
    #[arg(long, default_value = "0.0.0.0", env = "RELAY_BIND")]
    bind: String,

    /// Length of one stats window in seconds.
    #[arg(long, default_value_t = 5, env = "RELAY_STATS_INTERVAL")]
    stats_interval: u64,

    /// Largest accepted WebSocket message in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE, env = "RELAY_MAX_MESSAGE_SIZE")]
    max_message_size: usize,

    /// Frames buffered per recipient before further frames to it are dropped.
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_QUEUE, env = "RELAY_OUTBOUND_QUEUE")]
    outbound_queue: usize,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address or if any value
    /// fails [`RelayConfig::validate`].
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        let config = RelayConfig {
            bind_addr: SocketAddr::new(ip, self.port),
            stats_interval: Duration::from_secs(self.stats_interval),
            max_message_size: self.max_message_size,
            outbound_queue: self.outbound_queue,
        };
        config.validate().context("invalid relay configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. `tracing_subscriber` is initialised; `RUST_LOG` controls the level.
/// 2. CLI arguments (and their environment fallbacks) become a [`RelayConfig`].
/// 3. [`run_server`] binds the port and serves until Ctrl+C.
///
/// Any startup failure (bad configuration, port in use) is logged and the
/// process exits with a non-zero status.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = match Cli::parse().into_relay_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return Err(e);
        }
    };

    info!(
        "panel relay starting: bind={}, stats every {}s, max message {} bytes, queue {}",
        config.bind_addr,
        config.stats_interval.as_secs(),
        config.max_message_size,
        config.outbound_queue
    );

    // ── Serve until Ctrl+C ────────────────────────────────────────────────────
    if let Err(e) = run_server(config, shutdown_signal()).await {
        error!("relay server failed: {e:#}");
        return Err(e);
    }

    info!("panel relay stopped");
    Ok(())
}

/// Resolves when the user presses Ctrl+C (SIGINT on Unix).
///
/// If the signal handler cannot be installed the future never resolves, so
/// the server keeps running rather than shutting down at once.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => {
            error!("failed to listen for Ctrl+C signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
