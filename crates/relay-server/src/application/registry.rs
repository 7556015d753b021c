//! Registry: the authoritative set of live connections on one channel.
//!
//! # Locking discipline
//!
//! Membership lives in a `std::sync::RwLock<HashMap<..>>`.  Every method
//! takes the lock for a handful of instructions and releases it before
//! returning; it is never held across an `.await` or while delivering frames.
//!
//! [`Registry::for_each_except`] copies the current members (cheap `Arc`
//! clones) under a read lock and then iterates the copy with the lock
//! released.  A connection registering or leaving mid-broadcast therefore
//! never blocks the broadcast, and the broadcast never blocks it.
//!
//! # HashMap choice
//!
//! A `HashMap<ConnectionId, Arc<Connection>>` gives O(1) average register,
//! deregister and size.  Iteration order is unspecified, which is fine: the
//! relay guarantees ordering per sender, not across recipients.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::application::connection::Connection;
use crate::domain::ConnectionId;

/// In-memory set of live connections.  Lifetime = process uptime.
#[derive(Debug, Default)]
pub struct Registry {
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection keyed by its id.
    pub fn register(&self, connection: Arc<Connection>) {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        connections.insert(connection.id(), connection);
    }

    /// Adds a connection and runs `admit` with the new member count while
    /// still holding the write lock.
    ///
    /// No broadcast can snapshot the registry between the insert and
    /// `admit`, and concurrent registrations each see a distinct count.  If
    /// `admit` fails the connection is removed again before the lock is
    /// released.
    ///
    /// # Errors
    ///
    /// Returns whatever `admit` returns.
    pub fn register_with<T, E, F>(&self, connection: Arc<Connection>, admit: F) -> Result<T, E>
    where
        F: FnOnce(usize) -> Result<T, E>,
    {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let id = connection.id();
        connections.insert(id, connection);
        let result = admit(connections.len());
        if result.is_err() {
            connections.remove(&id);
        }
        result
    }

    /// Removes a connection.
    ///
    /// Idempotent: returns `true` if the id was present, `false` (and changes
    /// nothing) otherwise.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        connections.remove(&id).is_some()
    }

    /// Number of registered connections.
    pub fn size(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.read().contains_key(&id)
    }

    /// Returns a point-in-time copy of the members.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.read().values().cloned().collect()
    }

    /// Calls `f` once for every member other than `exclude`.
    ///
    /// Iterates a snapshot, so `f` may itself register or deregister
    /// connections without deadlocking.
    pub fn for_each_except<F>(&self, exclude: ConnectionId, mut f: F)
    where
        F: FnMut(&Arc<Connection>),
    {
        for connection in self.snapshot() {
            if connection.id() != exclude {
                f(&connection);
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ConnectionId, Arc<Connection>>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Channel;
    use axum::extract::ws::Message;
    use std::net::SocketAddr;
    use tokio::sync::mpsc;

    fn make_connection() -> (Arc<Connection>, mpsc::Receiver<Message>) {
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        Connection::new(addr, Channel::Frames, 8)
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = Registry::new();
        assert_eq!(registry.size(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_increases_size() {
        let registry = Registry::new();
        let (a, _rx_a) = make_connection();
        let (b, _rx_b) = make_connection();

        registry.register(Arc::clone(&a));
        registry.register(Arc::clone(&b));

        assert_eq!(registry.size(), 2);
        assert!(registry.contains(a.id()));
        assert!(registry.contains(b.id()));
    }

    #[test]
    fn test_register_same_connection_twice_counts_once() {
        let registry = Registry::new();
        let (a, _rx) = make_connection();

        registry.register(Arc::clone(&a));
        registry.register(Arc::clone(&a));

        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_register_with_passes_count_including_new_member() {
        let registry = Registry::new();
        let (a, _rx_a) = make_connection();
        let (b, _rx_b) = make_connection();
        registry.register(a);

        let seen = registry.register_with(Arc::clone(&b), Ok::<usize, ()>);

        assert_eq!(seen, Ok(2));
        assert!(registry.contains(b.id()));
    }

    #[test]
    fn test_register_with_failure_leaves_registry_unchanged() {
        let registry = Registry::new();
        let (a, _rx) = make_connection();

        let result: Result<(), &str> = registry.register_with(Arc::clone(&a), |_| Err("no"));

        assert_eq!(result, Err("no"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_register_with_sees_distinct_counts() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let (conn, rx) = make_connection();
                    let count = registry.register_with(conn, Ok::<usize, ()>).unwrap();
                    (count, rx)
                })
            })
            .collect();

        let mut counts: Vec<usize> = handles
            .into_iter()
            .map(|h| h.join().expect("worker thread panicked").0)
            .collect();
        counts.sort_unstable();

        assert_eq!(counts, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_deregister_removes_connection() {
        let registry = Registry::new();
        let (a, _rx) = make_connection();
        registry.register(Arc::clone(&a));

        assert!(registry.deregister(a.id()));

        assert_eq!(registry.size(), 0);
        assert!(!registry.contains(a.id()));
    }

    #[test]
    fn test_deregister_absent_id_is_noop() {
        let registry = Registry::new();
        let (a, _rx_a) = make_connection();
        registry.register(a);

        assert!(!registry.deregister(ConnectionId::new()));
        assert_eq!(registry.size(), 1, "unknown id must not change the count");
    }

    #[test]
    fn test_deregister_twice_is_noop() {
        let registry = Registry::new();
        let (a, _rx) = make_connection();
        registry.register(Arc::clone(&a));

        assert!(registry.deregister(a.id()));
        assert!(!registry.deregister(a.id()));
    }

    #[test]
    fn test_for_each_except_skips_excluded() {
        let registry = Registry::new();
        let (a, _rx_a) = make_connection();
        let (b, _rx_b) = make_connection();
        let (c, _rx_c) = make_connection();
        for conn in [&a, &b, &c] {
            registry.register(Arc::clone(conn));
        }

        let mut seen = Vec::new();
        registry.for_each_except(a.id(), |conn| seen.push(conn.id()));

        seen.sort();
        let mut expected = vec![b.id(), c.id()];
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_for_each_except_tolerates_mutation_during_iteration() {
        let registry = Registry::new();
        let (a, _rx_a) = make_connection();
        let (b, _rx_b) = make_connection();
        registry.register(Arc::clone(&a));
        registry.register(Arc::clone(&b));

        // Deregistering from inside the callback must not deadlock.
        let mut visits = 0;
        registry.for_each_except(ConnectionId::new(), |conn| {
            registry.deregister(conn.id());
            visits += 1;
        });

        assert_eq!(visits, 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_size_matches_open_connections_after_concurrent_churn() {
        // Arrange: 8 threads each register 50 connections and deregister
        // every other one while a reader keeps iterating.
        let registry = Arc::new(Registry::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                let mut kept = Vec::new();
                for i in 0..50 {
                    let (conn, rx) = make_connection();
                    registry.register(Arc::clone(&conn));
                    if i % 2 == 0 {
                        registry.deregister(conn.id());
                    } else {
                        kept.push((conn, rx));
                    }
                    registry.for_each_except(ConnectionId::new(), |_| {});
                }
                kept
            }));
        }

        let kept: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("worker thread panicked"))
            .collect();

        // Assert: exactly the kept connections remain.
        assert_eq!(registry.size(), kept.len());
        assert_eq!(kept.len(), 8 * 25);
        assert!(kept.iter().all(|(conn, _)| registry.contains(conn.id())));
    }
}
