//! TCP connections
//!
//! Blocking and non-blocking TCP transports for the store protocol. Each
//! `execute` call is exactly one request/response round-trip; framing and
//! parsing live in the codec.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};

use tokio::io::BufStream;
use tokio::net::TcpStream as AsyncTcpStream;

use crate::config::Config;
use crate::error::{Result, StowError};
use crate::store::codec::{
    read_response, read_response_async, write_command, write_command_async,
};
use crate::store::{Command, Response};

use super::{AsyncConnect, AsyncStoreConnection, Connect, StoreConnection};

/// A single blocking TCP connection
pub struct TcpConnection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,
}

impl TcpConnection {
    /// Open a connection and configure socket options from the config
    pub fn open(addr: SocketAddr, config: &Config) -> Result<Self> {
        let stream = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };

        // Disable Nagle's algorithm for low latency on small frames
        stream.set_nodelay(true)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }
}

impl StoreConnection for TcpConnection {
    fn execute(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }
}

/// Opens blocking TCP connections from a parsed config
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
    config: Config,
}

impl TcpConnector {
    pub fn new(config: Config) -> Result<Self> {
        let addr = config.socket_addr()?;
        Ok(Self { addr, config })
    }
}

impl Connect for TcpConnector {
    type Conn = TcpConnection;

    fn connect(&self) -> Result<Self::Conn> {
        TcpConnection::open(self.addr, &self.config)
    }
}

/// A single non-blocking TCP connection
pub struct AsyncTcpConnection {
    stream: BufStream<AsyncTcpStream>,
}

impl AsyncTcpConnection {
    /// Open a connection, honoring the configured connect timeout
    pub async fn open(addr: SocketAddr, config: &Config) -> Result<Self> {
        let stream = match config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, AsyncTcpStream::connect(addr))
                .await
                .map_err(|_| {
                    StowError::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("connect to {addr} timed out"),
                    ))
                })??,
            None => AsyncTcpStream::connect(addr).await?,
        };

        stream.set_nodelay(true)?;

        Ok(Self {
            stream: BufStream::new(stream),
        })
    }
}

impl AsyncStoreConnection for AsyncTcpConnection {
    async fn execute(&mut self, command: &Command) -> Result<Response> {
        write_command_async(&mut self.stream, command).await?;
        read_response_async(&mut self.stream).await
    }
}

/// Opens non-blocking TCP connections from a parsed config
#[derive(Debug, Clone)]
pub struct AsyncTcpConnector {
    addr: SocketAddr,
    config: Config,
}

impl AsyncTcpConnector {
    pub fn new(config: Config) -> Result<Self> {
        let addr = config.socket_addr()?;
        Ok(Self { addr, config })
    }
}

impl AsyncConnect for AsyncTcpConnector {
    type Conn = AsyncTcpConnection;

    async fn connect(&self) -> Result<Self::Conn> {
        AsyncTcpConnection::open(self.addr, &self.config).await
    }
}
