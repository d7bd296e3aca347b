//! Connection pools
//!
//! Bounded pools of reusable connections with RAII return-on-drop. A
//! connection that saw a failure is discarded instead of being returned,
//! since its protocol state can no longer be trusted. The drop path is
//! synchronous in both pools, so the non-blocking pool releases its slot
//! even when the operation holding it is cancelled.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, StowError};

use super::{AsyncConnect, Connect};

struct PoolState<T> {
    idle: VecDeque<T>,
    total: usize,
}

struct PoolInner<C, T> {
    connector: C,
    max_idle: usize,
    max_total: usize,
    state: Mutex<PoolState<T>>,
}

impl<C, T> PoolInner<C, T> {
    fn new(connector: C, max_idle: usize, max_total: usize) -> Self {
        Self {
            connector,
            max_idle,
            max_total,
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(max_idle),
                total: 0,
            }),
        }
    }

    fn pop_idle(&self) -> Option<T> {
        self.state.lock().idle.pop_front()
    }

    fn try_reserve(&self) -> bool {
        let mut state = self.state.lock();
        if state.total >= self.max_total {
            return false;
        }
        state.total += 1;
        true
    }

    fn release_slot(&self) {
        let mut state = self.state.lock();
        state.total = state.total.saturating_sub(1);
    }

    fn return_connection(&self, conn: T) {
        let mut state = self.state.lock();
        if state.idle.len() < self.max_idle {
            state.idle.push_back(conn);
        } else {
            state.total = state.total.saturating_sub(1);
        }
    }

    fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    fn total_count(&self) -> usize {
        self.state.lock().total
    }
}

// =============================================================================
// Blocking pool
// =============================================================================

/// Blocking connection pool handle
pub struct ConnectionPool<C: Connect> {
    inner: Arc<PoolInner<C, C::Conn>>,
}

impl<C: Connect> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connect> ConnectionPool<C> {
    pub fn new(connector: C, max_idle: usize, max_total: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner::new(connector, max_idle, max_total)),
        }
    }

    /// Acquire a connection, opening a new one when no idle connection exists
    pub fn acquire(&self) -> Result<PooledConnection<C>> {
        if let Some(conn) = self.inner.pop_idle() {
            return Ok(PooledConnection::new(self.inner.clone(), conn));
        }

        if !self.inner.try_reserve() {
            return Err(StowError::PoolExhausted);
        }

        match self.inner.connector.connect() {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                self.inner.release_slot();
                Err(err)
            }
        }
    }

    /// Number of idle connections currently held
    pub fn idle_count(&self) -> usize {
        self.inner.idle_count()
    }

    /// Total connections accounted for (idle + in-use)
    pub fn total_count(&self) -> usize {
        self.inner.total_count()
    }
}

/// RAII wrapper returning a blocking connection to its pool on drop
pub struct PooledConnection<C: Connect> {
    pool: Arc<PoolInner<C, C::Conn>>,
    conn: Option<C::Conn>,
    valid: bool,
}

impl<C: Connect> PooledConnection<C> {
    fn new(pool: Arc<PoolInner<C, C::Conn>>, conn: C::Conn) -> Self {
        Self {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    pub fn connection(&mut self) -> &mut C::Conn {
        self.conn.as_mut().expect("connection taken before drop")
    }

    /// Mark the connection unfit to return to the pool
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

impl<C: Connect> std::fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}

impl<C: Connect> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        if self.valid {
            self.pool.return_connection(conn);
        } else {
            self.pool.release_slot();
        }
    }
}

// =============================================================================
// Non-blocking pool
// =============================================================================

/// Non-blocking connection pool handle
pub struct AsyncConnectionPool<C: AsyncConnect> {
    inner: Arc<PoolInner<C, C::Conn>>,
}

impl<C: AsyncConnect> Clone for AsyncConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: AsyncConnect> AsyncConnectionPool<C> {
    pub fn new(connector: C, max_idle: usize, max_total: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner::new(connector, max_idle, max_total)),
        }
    }

    /// Acquire a connection; the only await point is opening a new one
    pub async fn acquire(&self) -> Result<AsyncPooledConnection<C>> {
        if let Some(conn) = self.inner.pop_idle() {
            return Ok(AsyncPooledConnection::new(self.inner.clone(), conn));
        }

        if !self.inner.try_reserve() {
            return Err(StowError::PoolExhausted);
        }

        // If this future is cancelled mid-connect, the reserved slot must
        // still be released; the guard below handles both outcomes.
        let mut slot = SlotGuard {
            pool: Some(self.inner.clone()),
        };
        let conn = self.inner.connector.connect().await?;
        slot.pool = None;

        Ok(AsyncPooledConnection::new(self.inner.clone(), conn))
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle_count()
    }

    pub fn total_count(&self) -> usize {
        self.inner.total_count()
    }
}

/// Releases a reserved slot unless disarmed
struct SlotGuard<C, T> {
    pool: Option<Arc<PoolInner<C, T>>>,
}

impl<C, T> Drop for SlotGuard<C, T> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release_slot();
        }
    }
}

/// RAII wrapper returning a non-blocking connection to its pool on drop
pub struct AsyncPooledConnection<C: AsyncConnect> {
    pool: Arc<PoolInner<C, C::Conn>>,
    conn: Option<C::Conn>,
    valid: bool,
}

impl<C: AsyncConnect> AsyncPooledConnection<C> {
    fn new(pool: Arc<PoolInner<C, C::Conn>>, conn: C::Conn) -> Self {
        Self {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    pub fn connection(&mut self) -> &mut C::Conn {
        self.conn.as_mut().expect("connection taken before drop")
    }

    /// Mark the connection unfit to return to the pool
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

impl<C: AsyncConnect> std::fmt::Debug for AsyncPooledConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncPooledConnection")
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}

impl<C: AsyncConnect> Drop for AsyncPooledConnection<C> {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        if self.valid {
            self.pool.return_connection(conn);
        } else {
            self.pool.release_slot();
        }
    }
}
