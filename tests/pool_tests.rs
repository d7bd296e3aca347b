//! Blocking pool tests: reuse, exhaustion, invalidation, and the idle cap.

use kvstow::client::{Connect, ConnectionPool, StoreConnection};
use kvstow::store::{Command, MemoryStore, Response};
use kvstow::{Result, StowError};

/// Connector that refuses to open connections
struct RefusingConnector;

struct NoConnection;

impl StoreConnection for NoConnection {
    fn execute(&mut self, _command: &Command) -> Result<Response> {
        unreachable!("never connected")
    }
}

impl Connect for RefusingConnector {
    type Conn = NoConnection;

    fn connect(&self) -> Result<Self::Conn> {
        Err(StowError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "nobody home",
        )))
    }
}

#[test]
fn connections_are_reused_after_return() {
    let pool = ConnectionPool::new(MemoryStore::new(), 4, 8);

    {
        let mut conn = pool.acquire().unwrap();
        conn.connection().execute(&Command::Ping).unwrap();
    }
    assert_eq!(pool.idle_count(), 1);
    assert_eq!(pool.total_count(), 1);

    // The second acquire takes the idle connection instead of opening one
    let _conn = pool.acquire().unwrap();
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.total_count(), 1);
}

#[test]
fn pool_exhaustion_is_reported_not_blocked() {
    let pool = ConnectionPool::new(MemoryStore::new(), 1, 1);

    let held = pool.acquire().unwrap();
    let err = pool.acquire().unwrap_err();
    assert!(matches!(err, StowError::PoolExhausted));
    assert!(err.is_connection_error());

    drop(held);
    pool.acquire().unwrap();
}

#[test]
fn invalidated_connections_are_discarded() {
    let pool = ConnectionPool::new(MemoryStore::new(), 4, 8);

    {
        let mut conn = pool.acquire().unwrap();
        conn.invalidate();
    }
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.total_count(), 0);
}

#[test]
fn idle_cap_sheds_surplus_connections() {
    let pool = ConnectionPool::new(MemoryStore::new(), 1, 4);

    let first = pool.acquire().unwrap();
    let second = pool.acquire().unwrap();
    assert_eq!(pool.total_count(), 2);

    drop(first);
    drop(second);

    // Only one connection fits the idle cap; the other is released
    assert_eq!(pool.idle_count(), 1);
    assert_eq!(pool.total_count(), 1);
}

#[test]
fn failed_connect_releases_its_slot() {
    let pool = ConnectionPool::new(RefusingConnector, 1, 1);

    assert!(matches!(pool.acquire().unwrap_err(), StowError::Io(_)));
    assert_eq!(pool.total_count(), 0);

    // The slot is free again, so the failure repeats instead of exhausting
    assert!(matches!(pool.acquire().unwrap_err(), StowError::Io(_)));
}

#[test]
fn pooled_connection_debug_reports_validity() {
    let pool = ConnectionPool::new(MemoryStore::new(), 1, 1);

    let mut conn = pool.acquire().unwrap();
    assert!(format!("{conn:?}").contains("valid: true"));

    conn.invalidate();
    assert!(format!("{conn:?}").contains("valid: false"));
}

#[test]
fn pool_handles_share_state() {
    let pool = ConnectionPool::new(MemoryStore::new(), 1, 1);
    let other = pool.clone();

    let _held = pool.acquire().unwrap();
    assert!(matches!(other.acquire().unwrap_err(), StowError::PoolExhausted));
}
