//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings.
//! `main.rs` populates it from CLI arguments and environment variables; tests
//! build it directly from [`RelayConfig::default`].

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::domain::error::ConfigError;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Length of one stats reporting window.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Largest accepted WebSocket message (16 MiB).  Panel snapshots are a few
/// hundred KiB of base64; this leaves room for uncompressed PNG captures.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Frames buffered per recipient before further frames to it are dropped.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// All runtime configuration for the relay.
///
/// # Example
///
/// ```rust
/// use relay_server::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8080);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address and port the HTTP/WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// How often the stats reporter logs and resets its message counter.
    pub stats_interval: Duration,

    /// Upper bound for one inbound WebSocket message or frame, in bytes.
    pub max_message_size: usize,

    /// Capacity of each connection's outbound queue.
    ///
    /// When a slow recipient's queue is full, new broadcasts to it are
    /// dropped (and logged) instead of stalling the sender.
    pub outbound_queue: usize,
}

impl Default for RelayConfig {
    /// | Field            | Default        |
    /// |------------------|----------------|
    /// | bind_addr        | `0.0.0.0:8080` |
    /// | stats_interval   | 5 seconds      |
    /// | max_message_size | 16 MiB         |
    /// | outbound_queue   | 64 frames      |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            stats_interval: DEFAULT_STATS_INTERVAL,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

impl RelayConfig {
    /// Checks the values that would otherwise panic or stall at runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a zero stats interval, a zero message
    /// size limit, or a zero-capacity outbound queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stats_interval.is_zero() {
            return Err(ConfigError::ZeroStatsInterval);
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::ZeroMessageSize);
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::ZeroOutboundQueue);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_8080() {
        assert_eq!(RelayConfig::default().bind_addr.port(), 8080);
    }

    #[test]
    fn test_default_binds_all_interfaces() {
        assert!(RelayConfig::default().bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_stats_interval_is_5s() {
        assert_eq!(RelayConfig::default().stats_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_default_is_valid() {
        assert_eq!(RelayConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_outbound_queue_is_rejected() {
        let cfg = RelayConfig {
            outbound_queue: 0,
            ..RelayConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroOutboundQueue));
    }

    #[test]
    fn test_zero_stats_interval_is_rejected() {
        let cfg = RelayConfig {
            stats_interval: Duration::ZERO,
            ..RelayConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroStatsInterval));
    }

    #[test]
    fn test_zero_message_size_is_rejected() {
        let cfg = RelayConfig {
            max_message_size: 0,
            ..RelayConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMessageSize));
    }
}
