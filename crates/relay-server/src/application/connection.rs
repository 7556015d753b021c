//! A live connection as seen by the registry and the broadcast relay.
//!
//! A [`Connection`] never touches the socket itself.  It owns the sending end
//! of a bounded queue; the session's writer task owns the receiving end and
//! drains it into the WebSocket.  Handing a frame to a recipient is therefore
//! a non-blocking `try_send`, and a slow socket only ever fills its own queue.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use axum::extract::ws::Message;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::{Channel, ConnectionId, ConnectionState, DeliveryError};

/// One live transport session.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    remote_addr: SocketAddr,
    channel: Channel,
    connected_at: SystemTime,
    opened: Instant,
    state: AtomicU8,
    outbound: mpsc::Sender<Message>,
    /// Set while frames for this connection are being dropped on a full queue.
    backlogged: AtomicBool,
}

impl Connection {
    /// Creates a connection in the `Connecting` state together with the
    /// receiving end of its outbound queue.
    ///
    /// # Panics
    ///
    /// Panics if `queue_capacity` is zero; [`crate::domain::RelayConfig::validate`]
    /// rejects that value at startup.
    pub fn new(
        remote_addr: SocketAddr,
        channel: Channel,
        queue_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (outbound, rx) = mpsc::channel(queue_capacity);
        let connection = Self {
            id: ConnectionId::new(),
            remote_addr,
            channel,
            connected_at: SystemTime::now(),
            opened: Instant::now(),
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            outbound,
            backlogged: AtomicBool::new(false),
        };
        (Arc::new(connection), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Wall-clock time the connection was accepted.
    pub fn connected_at(&self) -> SystemTime {
        self.connected_at
    }

    /// Time since the connection was accepted.
    pub fn age(&self) -> Duration {
        self.opened.elapsed()
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `true` while the connection is `Open`.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Moves the state forward to `to`.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// connection was already at `to` or beyond.
    pub fn advance(&self, to: ConnectionState) -> bool {
        let previous = self.state.fetch_max(to as u8, Ordering::AcqRel);
        previous < to as u8
    }

    /// Queues a frame for this connection without waiting.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::QueueFull`] when the writer is behind.
    /// - [`DeliveryError::Closed`] when the writer has stopped.
    pub fn try_deliver(&self, frame: Message) -> Result<(), DeliveryError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// `true` while the last delivery attempt found the queue full.
    pub fn is_backlogged(&self) -> bool {
        self.backlogged.load(Ordering::Acquire)
    }

    /// Records a full-queue drop.  Returns `true` only for the drop that
    /// moved the connection into the backlogged state.
    pub fn mark_backlogged(&self) -> bool {
        !self.backlogged.swap(true, Ordering::AcqRel)
    }

    /// Records a successful delivery.  Returns `true` only if the connection
    /// was backlogged until now.
    pub fn clear_backlog(&self) -> bool {
        self.is_backlogged() && self.backlogged.swap(false, Ordering::AcqRel)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
