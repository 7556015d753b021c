//! Stats/diagnostics reporter.
//!
//! Observability only: a message counter that is logged and reset once per
//! window, plus a point-in-time status report for the `/status` route.  No
//! thresholds, no alerting, nothing persisted.
//!
//! # Thread safety
//!
//! Every receive loop calls [`StatsReporter::record_message`] concurrently,
//! so the counter is an `AtomicU64`.  Only the periodic timer task resets it,
//! and the reset uses `swap(0)` so an increment racing with the reset lands
//! in exactly one window: never lost, never counted twice.  The window start
//! sits behind a `Mutex` that only the flush path takes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Liveness value reported by `/status`.
pub const STATUS_RUNNING: &str = "running";

/// Summary of one completed reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSummary {
    /// Inbound messages processed during the window.
    pub messages: u64,
    /// Actual length of the window.
    pub window: Duration,
    /// Connections registered at the end of the window.
    pub connections: usize,
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats: {} messages in the last {:.0} seconds, {} clients connected",
            self.messages,
            self.window.as_secs_f64(),
            self.connections
        )
    }
}

/// Per-channel connection counts in a [`StatusReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelCounts {
    pub frames: usize,
    pub sensor: usize,
}

/// Point-in-time status returned by `GET /status`.
///
/// ```json
/// {"status":"running","connections":3,"uptime":812.4,"channels":{"frames":3,"sensor":0}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub connections: usize,
    /// Process uptime in seconds.
    pub uptime: f64,
    pub channels: ChannelCounts,
}

/// Process-wide throughput counters.
#[derive(Debug)]
pub struct StatsReporter {
    messages: AtomicU64,
    window_start: Mutex<Instant>,
    window: Duration,
    started_at: Instant,
}

impl StatsReporter {
    /// Creates a reporter whose first window starts now.
    pub fn new(window: Duration) -> Self {
        let now = Instant::now();
        Self {
            messages: AtomicU64::new(0),
            window_start: Mutex::new(now),
            window,
            started_at: now,
        }
    }

    /// Counts one processed inbound message.
    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Messages counted so far in the current window.
    pub fn messages_in_window(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    /// Configured window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Time since the reporter (and so the process) started.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Closes the current window at `now`, returning its summary and starting
    /// a new one.
    pub fn flush(&self, now: Instant, connections: usize) -> StatsSummary {
        let mut start = self.lock_window_start();
        self.close_window(&mut start, now, connections)
    }

    /// Like [`StatsReporter::flush`], but only once a full window has elapsed.
    ///
    /// The check and the flush happen under one lock, so when several callers
    /// race past the window end exactly one of them gets the summary.
    pub fn flush_if_elapsed(&self, now: Instant, connections: usize) -> Option<StatsSummary> {
        let mut start = self.lock_window_start();
        if now.saturating_duration_since(*start) < self.window {
            return None;
        }
        Some(self.close_window(&mut start, now, connections))
    }

    fn lock_window_start(&self) -> MutexGuard<'_, Instant> {
        self.window_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn close_window(&self, start: &mut Instant, now: Instant, connections: usize) -> StatsSummary {
        let messages = self.messages.swap(0, Ordering::Relaxed);
        let window = now.saturating_duration_since(*start);
        *start = now;
        StatsSummary {
            messages,
            window,
            connections,
        }
    }

    /// Builds the `/status` report.
    pub fn status(&self, channels: ChannelCounts) -> StatusReport {
        StatusReport {
            status: STATUS_RUNNING,
            connections: channels.frames + channels.sensor,
            uptime: self.uptime().as_secs_f64(),
            channels,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
