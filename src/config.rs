//! Configuration for kvstow
//!
//! Centralized configuration with sensible defaults. Helpers receive a
//! `Config` at construction time; there is no process-wide default or
//! singleton pool.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, StowError};

/// Well-known URI scheme for the store
pub const URI_SCHEME: &str = "kv://";

/// Main configuration for a kvstow helper instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Location
    // -------------------------------------------------------------------------
    /// Normalized store URI, e.g. "kv://127.0.0.1:7379"
    pub store_uri: String,

    // -------------------------------------------------------------------------
    // Pool Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of idle connections to keep
    pub max_idle: usize,

    /// Maximum total connections (idle + in-use)
    pub max_total: usize,

    // -------------------------------------------------------------------------
    // Timeouts (delegated to the TCP layer; None = OS default)
    // -------------------------------------------------------------------------
    /// Optional TCP connect timeout
    pub connect_timeout: Option<Duration>,

    /// Optional TCP read timeout
    pub read_timeout: Option<Duration>,

    /// Optional TCP write timeout
    pub write_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_uri: format!("{URI_SCHEME}127.0.0.1:7379"),
            max_idle: 8,
            max_total: 16,
            connect_timeout: Some(Duration::from_secs(5)),
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Normalize a store URI, synthesizing the `kv://` prefix when absent
    pub fn normalize_uri(uri: &str) -> String {
        if uri.starts_with(URI_SCHEME) {
            uri.to_string()
        } else {
            format!("{URI_SCHEME}{uri}")
        }
    }

    /// Parse the socket address out of the configured URI
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let trimmed = self
            .store_uri
            .strip_prefix(URI_SCHEME)
            .unwrap_or(&self.store_uri);

        if trimmed.is_empty() {
            return Err(StowError::InvalidUri(self.store_uri.clone()));
        }

        trimmed
            .parse()
            .map_err(|_| StowError::InvalidUri(self.store_uri.clone()))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store URI (normalized with the `kv://` scheme)
    pub fn store_uri(mut self, uri: impl AsRef<str>) -> Self {
        self.config.store_uri = Config::normalize_uri(uri.as_ref());
        self
    }

    /// Set the maximum number of idle connections kept in the pool
    pub fn max_idle(mut self, count: usize) -> Self {
        self.config.max_idle = count;
        self
    }

    /// Set the maximum total connections (idle + in-use)
    pub fn max_total(mut self, count: usize) -> Self {
        self.config.max_total = count;
        self
    }

    /// Set the TCP connect timeout
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the TCP read timeout
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the TCP write timeout
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
