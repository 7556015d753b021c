//! Broadcast relay: deliver one sender's frame to every other connection.
//!
//! # Failure isolation
//!
//! Each recipient is handled independently.  A recipient whose queue is full
//! or whose writer has stopped is logged and recorded in the returned
//! [`BroadcastReport`], and the loop moves on to the next recipient.  The
//! sender never learns about it.
//!
//! A slow recipient can miss many frames in a row.  Only the first drop of
//! such a run is logged at warn (and the recovery at info); the drops in
//! between are logged at debug.
//!
//! # Ordering
//!
//! A sender's receive loop calls [`broadcast`] once per inbound frame, in
//! order, and each recipient's queue is FIFO.  Two frames from the same sender
//! therefore reach every recipient in the order they were sent.  Nothing is
//! promised across different senders.
//!
//! # Cost per recipient
//!
//! `Message` holds its payload in reference-counted `Bytes`, so cloning a
//! multi-megabyte frame for each recipient copies a pointer, not the image.

use axum::extract::ws::Message;
use tracing::{debug, info, warn};

use crate::application::registry::Registry;
use crate::domain::{ConnectionId, ConnectionState, DeliveryError};

/// Outcome of one [`broadcast`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients whose queue accepted the frame.
    pub delivered: usize,
    /// Recipients that could not be served, with the reason.
    pub failures: Vec<(ConnectionId, DeliveryError)>,
}

impl BroadcastReport {
    /// Number of recipients attempted.
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

/// Delivers `frame` to every connection in `registry` except `sender`.
///
/// Best-effort and at-most-once per recipient: no retries, no
/// acknowledgements.  Never blocks.
pub fn broadcast(registry: &Registry, sender: ConnectionId, frame: &Message) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    registry.for_each_except(sender, |recipient| {
        match recipient.try_deliver(frame.clone()) {
            Ok(()) => {
                if recipient.clear_backlog() {
                    info!("{} caught up; delivering frames again", recipient.id());
                }
                report.delivered += 1;
            }
            Err(DeliveryError::QueueFull) => {
                if recipient.mark_backlogged() {
                    warn!(
                        "dropping frames for {}: outbound queue full",
                        recipient.id()
                    );
                } else {
                    debug!(
                        "dropping frame from {sender} for {}: still backlogged",
                        recipient.id()
                    );
                }
                report.failures.push((recipient.id(), DeliveryError::QueueFull));
            }
            Err(DeliveryError::Closed) => {
                // The recipient's own session task deregisters it; marking it
                // here only records that it is on its way out.
                recipient.advance(ConnectionState::Closing);
                debug!(
                    "skipping {}: connection closed before delivery",
                    recipient.id()
                );
                report.failures.push((recipient.id(), DeliveryError::Closed));
            }
        }
    });

    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────
