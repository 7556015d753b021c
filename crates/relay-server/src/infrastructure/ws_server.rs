//! WebSocket server: listener, per-session tasks and the stats timer.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Serving the router from [`crate::infrastructure::http`] on it.
//! 3. Upgrading `/`, `/ws` and `/sensor` requests to WebSocket sessions.
//! 4. Running each session as two concurrent halves:
//!    - **Reader**: reads frames from the socket and hands each one to
//!      [`RelayService::handle_inbound`].
//!    - **Writer**: drains the connection's outbound queue into the socket.
//! 5. Logging a stats summary once per stats window.
//! 6. Stopping when the shutdown future resolves.
//!
//! # Session lifecycle
//!
//! ```text
//! CONNECTING ──registered, greeting queued──► OPEN
//!      OPEN ──reader ended / writer failed──► CLOSING ──deregistered──► CLOSED
//! ```
//!
//! Registration and the greeting happen together under the registry lock
//! ([`RelayService::admit`]), so the greeting is always the first frame the
//! client sees.
//!
//! # Message size
//!
//! The WebSocket layer accepts messages of any size.  The relay applies
//! `max_message_size` itself, per message, so an oversized message is
//! dropped and logged while the connection stays open.  Deregistration happens in exactly
//! one place, [`handle_session`], after the session has ended for whatever
//! reason.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::application::{Connection, RelayService};
use crate::domain::{Channel, ConnectionState, RelayConfig};
use crate::infrastructure::http::{router, AppState};

// ── Public API ────────────────────────────────────────────────────────────────

/// A bound, not yet running relay server.
///
/// Splitting bind from run lets callers (and tests binding port 0) learn the
/// actual listening address before traffic starts.
#[derive(Debug)]
pub struct RelayServer {
    listener: TcpListener,
    config: Arc<RelayConfig>,
    service: Arc<RelayService>,
}

impl RelayServer {
    /// Validates `config` and binds the listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the address cannot
    /// be bound (port in use, missing permission).
    pub async fn bind(config: RelayConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid relay configuration")?;

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("failed to bind relay listener on {}", config.bind_addr))?;

        let service = Arc::new(
            RelayService::new(config.stats_interval)
                .with_max_message_size(config.max_message_size),
        );
        Ok(Self {
            listener,
            config: Arc::new(config),
            service,
        })
    }

    /// The address actually bound (differs from the configured one for port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the OS cannot report the socket address.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read relay listener address")
    }

    /// Shared relay state, for inspection.
    pub fn service(&self) -> Arc<RelayService> {
        Arc::clone(&self.service)
    }

    /// Serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the server stops for any reason other than
    /// `shutdown`.
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!("relay listening on {addr} (frames: / and /ws, sensor: /sensor, status: /status)");

        let stats_task = tokio::spawn(run_stats_timer(
            Arc::clone(&self.service),
            self.config.stats_interval,
        ));

        let app = router(AppState {
            service: Arc::clone(&self.service),
            config: Arc::clone(&self.config),
        });

        let result = axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .context("relay server stopped unexpectedly");

        stats_task.abort();
        info!("relay on {addr} stopped");
        result
    }
}

/// Binds `config.bind_addr` and serves until `shutdown` resolves.
///
/// # Errors
///
/// See [`RelayServer::bind`] and [`RelayServer::run`].
pub async fn run_server<F>(config: RelayConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    RelayServer::bind(config).await?.run(shutdown).await
}

// ── Upgrade handlers ──────────────────────────────────────────────────────────

/// `GET /` and `GET /ws`: join the frames channel.
pub(crate) async fn frames_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    upgrade(ws, addr, state, Channel::Frames)
}

/// `GET /sensor`: join the sensor channel.
pub(crate) async fn sensor_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    upgrade(ws, addr, state, Channel::Sensor)
}

fn upgrade(ws: WebSocketUpgrade, addr: SocketAddr, state: AppState, channel: Channel) -> Response {
    // Lift the transport limits; `RelayService::handle_inbound` enforces the
    // configured size without closing the connection.
    ws.max_message_size(usize::MAX)
        .max_frame_size(usize::MAX)
        .on_failed_upgrade(move |e| warn!("WebSocket upgrade from {addr} failed: {e}"))
        .on_upgrade(move |socket| handle_session(socket, addr, channel, state))
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Top-level handler for one WebSocket session.
///
/// Wraps [`run_session`], logs the outcome, then deregisters the connection.
/// This is the only place a connection leaves the registry.
async fn handle_session(socket: WebSocket, addr: SocketAddr, channel: Channel, state: AppState) {
    let (conn, outbound_rx) = Connection::new(addr, channel, state.config.outbound_queue);
    let id = conn.id();
    info!("connection {id} from {addr} joined the {channel} channel");

    match run_session(socket, &conn, outbound_rx, &state.service).await {
        Ok(()) => info!("connection {id} ({addr}) closed normally"),
        Err(e) => warn!("connection {id} ({addr}) closed with error: {e:#}"),
    }

    conn.advance(ConnectionState::Closing);
    if !state.service.registry(channel).deregister(id) {
        debug!("connection {id} was never registered");
    }
    conn.advance(ConnectionState::Closed);

    info!(
        "connection {id} removed after {:.1}s; {} clients connected",
        conn.age().as_secs_f64(),
        state.service.connection_count()
    );
}

/// Runs one session until the client leaves or the socket fails.
///
/// # Errors
///
/// Returns an error if the greeting cannot be queued, a receive fails, or
/// the writer cannot send to the socket.
async fn run_session(
    socket: WebSocket,
    conn: &Arc<Connection>,
    mut outbound_rx: mpsc::Receiver<Message>,
    service: &RelayService,
) -> anyhow::Result<()> {
    let id = conn.id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    // ── Step 1: Register and greet ────────────────────────────────────────────
    let clients = service.admit(conn).context("failed to admit connection")?;
    conn.advance(ConnectionState::Open);
    debug!("connection {id} greeted; {clients} clients connected");

    // ── Step 2: Writer task ───────────────────────────────────────────────────
    //
    // Owns the sink.  Frames from other clients arrive on `outbound_rx`.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            ws_tx.send(frame).await?;
        }
        Ok::<(), axum::Error>(())
    });

    // ── Step 3: Reader loop ───────────────────────────────────────────────────
    let reader = async {
        while let Some(frame) = ws_rx.next().await {
            let frame = frame.context("WebSocket receive failed")?;
            if let Message::Close(reason) = &frame {
                debug!("connection {id}: close frame received ({reason:?})");
                break;
            }
            // A bad or oversized frame is dropped; the session carries on.
            if let Err(e) = service.handle_inbound(conn, &frame) {
                warn!("connection {id}: dropping message: {e}");
            }
        }
        Ok::<(), anyhow::Error>(())
    };

    // ── Step 4: Wait for either half to finish ────────────────────────────────
    tokio::select! {
        result = reader => {
            writer.abort();
            result
        }
        joined = &mut writer => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("WebSocket send failed")),
            Err(e) => Err(anyhow::Error::new(e).context("writer task failed")),
        },
    }
}

// ── Stats timer ───────────────────────────────────────────────────────────────

/// Logs one stats summary per `period`, forever.
///
/// Busy windows are logged at info, idle ones at debug.
async fn run_stats_timer(service: Arc<RelayService>, period: Duration) {
    let mut ticker = interval(period);
    // The first tick resolves immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let summary = service.flush_stats(Instant::now());
        if summary.messages > 0 {
            info!("{summary}");
        } else {
            debug!("{summary}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigError;
    use std::net::Ipv4Addr;

    fn loopback_config() -> RelayConfig {
        RelayConfig {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            ..RelayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bind_port_zero_reports_real_port() {
        let server = RelayServer::bind(loopback_config()).await.unwrap();

        let addr = server.local_addr().unwrap();

        assert_ne!(addr.port(), 0);
        assert_eq!(server.service().connection_count(), 0);
    }

    #[tokio::test]
    async fn test_bind_applies_message_size_limit_to_service() {
        let config = RelayConfig {
            max_message_size: 1024,
            ..loopback_config()
        };

        let server = RelayServer::bind(config).await.unwrap();

        assert_eq!(server.service().max_message_size(), 1024);
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = RelayConfig {
            outbound_queue: 0,
            ..loopback_config()
        };

        let err = RelayServer::bind(config).await.unwrap_err();

        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::ZeroOutboundQueue)
        );
    }

    #[tokio::test]
    async fn test_bind_address_in_use_is_an_error() {
        let first = RelayServer::bind(loopback_config()).await.unwrap();
        let taken = RelayConfig {
            bind_addr: first.local_addr().unwrap(),
            ..RelayConfig::default()
        };

        let err = RelayServer::bind(taken).await.unwrap_err();

        assert!(err.to_string().contains("failed to bind"), "got {err:#}");
    }

    #[tokio::test]
    async fn test_run_returns_when_shutdown_resolves() {
        let server = RelayServer::bind(loopback_config()).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), server.run(async {})).await;

        assert!(matches!(result, Ok(Ok(()))));
    }
}
