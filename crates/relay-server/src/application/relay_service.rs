//! RelayService: the per-frame pipeline shared by every session.
//!
//! The service owns one [`Registry`] per channel and the [`StatsReporter`].
//! It is created once per server (not a global) and shared with the session
//! tasks through an `Arc`, so tests can build a fresh one each time.
//!
//! # Pipeline (frames channel)
//!
//! ```text
//! raw frame ──► size check ──► decode ──► classify + log ──► broadcast raw frame ──► stats
//!                  │              │
//!                  └─ Oversized / DecodeError: logged by the caller, frame dropped
//! ```
//!
//! Any well-formed JSON value decodes; only syntax errors and truncated input
//! are dropped.
//!
//! # Pipeline (sensor channel)
//!
//! ```text
//! raw frame ──► parse (unwrap nested JSON string) ──► broadcast compact JSON ──► stats
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::ws::Message;
use relay_core::{classify, decode, encode_text, parse_sensor_event, Envelope, Severity};
use tracing::{debug, info, warn};

use crate::application::broadcast::{broadcast, BroadcastReport};
use crate::application::connection::Connection;
use crate::application::registry::Registry;
use crate::application::stats::{ChannelCounts, StatsReporter, StatsSummary, StatusReport};
use crate::domain::config::DEFAULT_MAX_MESSAGE_SIZE;
use crate::domain::{AdmitError, Channel, FrameError};

/// Shared relay state and the operations the session tasks drive.
#[derive(Debug)]
pub struct RelayService {
    frames: Registry,
    sensors: Registry,
    stats: StatsReporter,
    max_message_size: usize,
    /// Serializes admissions so each greeting sees a distinct total.
    admission: Mutex<()>,
}

impl RelayService {
    /// Creates a service with empty registries, a stats window of
    /// `stats_window` and the default per-message size limit.
    pub fn new(stats_window: Duration) -> Self {
        Self {
            frames: Registry::new(),
            sensors: Registry::new(),
            stats: StatsReporter::new(stats_window),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            admission: Mutex::new(()),
        }
    }

    /// Sets the largest inbound message, in bytes, that will be relayed.
    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// The registry for `channel`.
    pub fn registry(&self, channel: Channel) -> &Registry {
        match channel {
            Channel::Frames => &self.frames,
            Channel::Sensor => &self.sensors,
        }
    }

    pub fn stats(&self) -> &StatsReporter {
        &self.stats
    }

    /// Connection counts per channel.
    pub fn channel_counts(&self) -> ChannelCounts {
        ChannelCounts {
            frames: self.frames.size(),
            sensor: self.sensors.size(),
        }
    }

    /// Total live connections across both channels.
    pub fn connection_count(&self) -> usize {
        self.frames.size() + self.sensors.size()
    }

    /// Registers `connection` on its channel and queues its greeting.
    ///
    /// The greeting reports the total number of clients across both
    /// channels, including the new one, and is queued while the channel's
    /// registry is still write-locked.  No broadcast can reach the new
    /// client ahead of it, and two clients admitted at the same time never
    /// report the same count.
    ///
    /// Returns the count sent in the greeting.
    ///
    /// # Errors
    ///
    /// Returns an [`AdmitError`] if the greeting cannot be encoded or
    /// queued.  The connection is then not registered.
    pub fn admit(&self, connection: &Arc<Connection>) -> Result<usize, AdmitError> {
        let _admission = self
            .admission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let channel = connection.channel();
        let elsewhere = match channel {
            Channel::Frames => self.sensors.size(),
            Channel::Sensor => self.frames.size(),
        };

        self.registry(channel)
            .register_with(Arc::clone(connection), |members| -> Result<usize, AdmitError> {
                let clients = members + elsewhere;
                let greeting = encode_text(&Envelope::greeting(clients))?;
                connection.try_deliver(Message::text(greeting))?;
                Ok(clients)
            })
    }

    /// Processes one inbound frame from `sender`.
    ///
    /// Text and binary frames are relayed; control frames (ping, pong,
    /// close) are ignored and return `Ok(None)`.  Every data frame is
    /// counted, including frames that are too large or fail to decode.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] when the frame exceeds the size limit or
    /// could not be decoded; the frame has then not been relayed.  The
    /// caller logs it and moves on.
    pub fn handle_inbound(
        &self,
        sender: &Connection,
        frame: &Message,
    ) -> Result<Option<BroadcastReport>, FrameError> {
        let Some(raw) = frame_payload(frame) else {
            return Ok(None);
        };

        let result = if raw.len() > self.max_message_size {
            Err(FrameError::Oversized {
                size: raw.len(),
                limit: self.max_message_size,
            })
        } else {
            self.relay(sender, raw, frame)
        };
        self.stats.record_message();
        result.map(Some)
    }

    fn relay(
        &self,
        sender: &Connection,
        raw: &[u8],
        frame: &Message,
    ) -> Result<BroadcastReport, FrameError> {
        match sender.channel() {
            Channel::Frames => self.relay_envelope(sender, raw, frame),
            Channel::Sensor => self.relay_sensor_event(sender, raw),
        }
    }

    /// Point-in-time status for `/status`.
    pub fn status(&self) -> StatusReport {
        self.stats.status(self.channel_counts())
    }

    /// Closes the current stats window.  Called by the periodic timer.
    pub fn flush_stats(&self, now: Instant) -> StatsSummary {
        self.stats.flush(now, self.connection_count())
    }

    fn relay_envelope(
        &self,
        sender: &Connection,
        raw: &[u8],
        frame: &Message,
    ) -> Result<BroadcastReport, FrameError> {
        let envelope = decode(raw)?;

        let hint = classify(&envelope);
        match hint.severity {
            Severity::Debug => debug!("{hint}"),
            Severity::Info => info!("{hint}"),
            Severity::Warn => warn!("{hint}; relaying anyway"),
        }

        // Forward the original frame, not a re-encoding of `envelope`.
        Ok(broadcast(&self.frames, sender.id(), frame))
    }

    fn relay_sensor_event(
        &self,
        sender: &Connection,
        raw: &[u8],
    ) -> Result<BroadcastReport, FrameError> {
        let event = parse_sensor_event(raw)?;
        debug!(
            "sensor event from {}{}: {}",
            sender.id(),
            if event.was_nested() { " (nested)" } else { "" },
            event.summary()
        );

        let outbound = Message::text(event.to_wire()?);
        Ok(broadcast(&self.sensors, sender.id(), &outbound))
    }
}

/// Returns the payload bytes of a data frame, or `None` for control frames.
fn frame_payload(frame: &Message) -> Option<&[u8]> {
    match frame {
        Message::Text(text) => Some(text.as_str().as_bytes()),
        Message::Binary(bytes) => Some(bytes.as_ref()),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
