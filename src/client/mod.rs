//! Connection capabilities
//!
//! The helpers are generic over how connections are made, so the same
//! dispatch and error contract covers the TCP client and the in-process
//! `MemoryStore`. The execution mode is part of the trait pair: blocking
//! helpers require `Connect`, non-blocking helpers require `AsyncConnect`.
//! The mode is fixed when the helper is built, never detected at runtime.

pub mod connection;
pub mod pool;

use crate::error::Result;
use crate::store::{Command, Response};

/// One blocking connection to the store
pub trait StoreConnection {
    /// Execute a single command as one atomic request/response round-trip
    fn execute(&mut self, command: &Command) -> Result<Response>;
}

/// Capability to open blocking connections
pub trait Connect {
    type Conn: StoreConnection;

    fn connect(&self) -> Result<Self::Conn>;
}

/// One non-blocking connection to the store
pub trait AsyncStoreConnection {
    /// Execute a single command; the await point is the network round-trip
    fn execute(
        &mut self,
        command: &Command,
    ) -> impl std::future::Future<Output = Result<Response>> + Send;
}

/// Capability to open non-blocking connections
pub trait AsyncConnect {
    type Conn: AsyncStoreConnection;

    fn connect(&self) -> impl std::future::Future<Output = Result<Self::Conn>> + Send;
}

pub use connection::{AsyncTcpConnection, AsyncTcpConnector, TcpConnection, TcpConnector};
pub use pool::{AsyncConnectionPool, AsyncPooledConnection, ConnectionPool, PooledConnection};
