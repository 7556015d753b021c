//! Connection identity and lifecycle.
//!
//! # Connection lifecycle (for beginners)
//!
//! ```text
//! Connecting  ──►  Open  ──►  Closing  ──►  Closed
//! ```
//!
//! - `Connecting`: the WebSocket upgrade finished; not yet registered.
//! - `Open`: registered and greeted; frames are being relayed.
//! - `Closing`: the peer left, a write failed, or its queue was found closed.
//! - `Closed`: deregistered.  Terminal.
//!
//! States only ever move forward.  That lets the state live in a single
//! `AtomicU8` updated with `fetch_max`: a late "Closing" can never undo an
//! earlier "Closed".

use std::fmt;

use uuid::Uuid;

/// Opaque identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first UUID group is plenty to tell log lines apart.
        let text = self.0.to_string();
        f.write_str(&text[..8])
    }
}

/// Lifecycle state of a connection.  Ordered: later states compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    /// Converts the raw atomic representation back into a state.
    ///
    /// Values above `Closed` saturate to `Closed`.
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// The logical channel a client connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Envelopes and image frames between panels (`/` or `/ws`).
    Frames,
    /// Low-rate structured sensor events (`/sensor`).
    Sensor,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Frames => "frames",
            Channel::Sensor => "sensor",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_connection_id_display_is_short() {
        assert_eq!(ConnectionId::new().to_string().len(), 8);
    }

    #[test]
    fn test_state_roundtrips_through_u8() {
        for state in [
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            assert_eq!(ConnectionState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(ConnectionState::Connecting < ConnectionState::Open);
        assert!(ConnectionState::Open < ConnectionState::Closing);
        assert!(ConnectionState::Closing < ConnectionState::Closed);
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::Frames.to_string(), "frames");
        assert_eq!(Channel::Sensor.to_string(), "sensor");
    }
}
