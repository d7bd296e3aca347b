//! Non-blocking helper
//!
//! The cooperative twin of `StowHelper`: same dispatch and error contract,
//! scheduled on a tokio runtime. Suspension points are exactly the store
//! round-trips; connections are released by RAII guard even when a pending
//! operation is cancelled.

use std::collections::BTreeMap;

use crate::client::{AsyncConnect, AsyncConnectionPool, AsyncStoreConnection, AsyncTcpConnector};
use crate::config::Config;
use crate::entry::Entry;
use crate::error::{Result, StowError};
use crate::store::{Command, Response};

use super::{
    expect_bool, expect_bulk, expect_count, expect_list, expect_map, expect_ok, not_found,
    storage_field, FetchAll, OpContext,
};

/// Non-blocking helper over a pooled store connection
pub struct AsyncStowHelper<C: AsyncConnect> {
    pool: AsyncConnectionPool<C>,
}

impl AsyncStowHelper<AsyncTcpConnector> {
    /// Build a TCP-backed helper from a config
    pub fn connect(config: Config) -> Result<Self> {
        let connector = AsyncTcpConnector::new(config.clone())?;
        Ok(Self::with_connector(connector, &config))
    }
}

impl<C: AsyncConnect> AsyncStowHelper<C> {
    /// Build a helper over any async connect capability
    pub fn with_connector(connector: C, config: &Config) -> Self {
        Self {
            pool: AsyncConnectionPool::new(connector, config.max_idle, config.max_total),
        }
    }

    pub fn pool(&self) -> &AsyncConnectionPool<C> {
        &self.pool
    }

    // =========================================================================
    // Operation wrapper
    // =========================================================================

    /// Acquire a connection, run one command, interpret its reply, and
    /// normalize failures exactly like the blocking wrapper.
    async fn run<T>(
        &self,
        ctx: &OpContext,
        command: &Command,
        interpret: fn(Response) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|err| StowError::Connection {
                op: ctx.op.clone(),
                source: Box::new(err),
            })?;

        let outcome = match conn.connection().execute(command).await {
            Ok(response) => interpret(response),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(value) => Ok(value),
            Err(err) => {
                if matches!(err, StowError::Io(_) | StowError::Protocol(_)) {
                    conn.invalidate();
                }
                tracing::error!(op = %ctx.op, error = %err, "store command failed");
                Err(StowError::Store {
                    op: ctx.op.clone(),
                    key: ctx.key.clone(),
                    field: ctx.field.clone(),
                    source: Box::new(err),
                })
            }
        }
    }

    // =========================================================================
    // Raw store operations
    // =========================================================================

    /// Check whether a key (or a field within its hash-map) exists
    pub async fn exists(&self, key: &str, field: Option<&str>) -> Result<bool> {
        let (ctx, command) = match field {
            Some(field) => (
                OpContext::hash("hexists", key, field),
                Command::HExists {
                    key: key.to_string(),
                    field: field.to_string(),
                },
            ),
            None => (
                OpContext::flat("exists", key),
                Command::Exists {
                    key: key.to_string(),
                },
            ),
        };

        self.run(&ctx, &command, expect_bool).await
    }

    /// Fetch raw bytes; same missing/raced semantics as the blocking `get`
    pub async fn get(
        &self,
        key: &str,
        field: Option<&str>,
        missing_okay: bool,
    ) -> Result<Option<Vec<u8>>> {
        if !self.exists(key, field).await? {
            if missing_okay {
                return Ok(None);
            }
            return Err(not_found(key, field));
        }

        let (ctx, command) = match field {
            Some(field) => (
                OpContext::hash("hget", key, field),
                Command::HGet {
                    key: key.to_string(),
                    field: field.to_string(),
                },
            ),
            None => (
                OpContext::flat("get", key),
                Command::Get {
                    key: key.to_string(),
                },
            ),
        };

        match self.run(&ctx, &command, expect_bulk).await? {
            Some(bytes) => Ok(Some(bytes)),
            None if missing_okay => Ok(None),
            None => Err(not_found(key, field)),
        }
    }

    /// Store raw bytes; overwrites are logged and allowed
    pub async fn set(&self, key: &str, field: Option<&str>, value: &[u8]) -> Result<bool> {
        if self.exists(key, field).await? {
            tracing::warn!(key = %key, field = ?field, "overwriting existing entry");
        }

        match field {
            Some(field) => {
                let ctx = OpContext::hash("hset", key, field);
                let command = Command::HSet {
                    key: key.to_string(),
                    field: field.to_string(),
                    value: value.to_vec(),
                };
                self.run(&ctx, &command, expect_bool).await
            }
            None => {
                let ctx = OpContext::flat("set", key);
                let command = Command::Set {
                    key: key.to_string(),
                    value: value.to_vec(),
                };
                self.run(&ctx, &command, expect_ok).await?;
                Ok(true)
            }
        }
    }

    /// Delete a key or hash-map field; absent entries are a logged no-op
    pub async fn delete(&self, key: &str, field: Option<&str>, check_exists: bool) -> Result<bool> {
        if check_exists && !self.exists(key, field).await? {
            tracing::warn!(
                key = %key,
                field = ?field,
                "request to delete entry ignored: no such entry"
            );
            return Ok(false);
        }

        let (ctx, command) = match field {
            Some(field) => (
                OpContext::hash("hdel", key, field),
                Command::HDel {
                    key: key.to_string(),
                    field: field.to_string(),
                },
            ),
            None => (
                OpContext::flat("delete", key),
                Command::Delete {
                    key: key.to_string(),
                },
            ),
        };

        self.run(&ctx, &command, expect_bool).await
    }

    /// Enumerate the field names of a hash-map
    pub async fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        let ctx = OpContext::flat("hkeys", key);
        let command = Command::HKeys {
            key: key.to_string(),
        };
        self.run(&ctx, &command, expect_list).await
    }

    /// Fetch every field of a hash-map as raw bytes
    pub async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let ctx = OpContext::flat("hgetall", key);
        let command = Command::HGetAll {
            key: key.to_string(),
        };
        let pairs = self.run(&ctx, &command, expect_map).await?;
        Ok(pairs.into_iter().collect())
    }

    /// Enumerate keys matching a glob pattern (`*` when omitted)
    pub async fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let pattern = pattern.unwrap_or("*");
        let ctx = OpContext::pattern("keys", pattern);
        let command = Command::Keys {
            pattern: pattern.to_string(),
        };
        self.run(&ctx, &command, expect_list).await
    }

    /// Probe whether a key holds a flat value or a hash-map
    pub async fn kind(&self, key: &str) -> Result<Option<String>> {
        let ctx = OpContext::flat("kind", key);
        let command = Command::Kind {
            key: key.to_string(),
        };
        let bytes = self.run(&ctx, &command, expect_bulk).await?;
        Ok(bytes.map(|data| String::from_utf8_lossy(&data).into_owned()))
    }

    /// Health check
    pub async fn ping(&self) -> Result<()> {
        let ctx = OpContext::bare("ping");
        self.run(&ctx, &Command::Ping, expect_bulk).await?;
        Ok(())
    }

    /// Publish a payload to a channel; returns the delivery count
    pub async fn publish(&self, channel: &str, payload: &[u8]) -> Result<u64> {
        let ctx = OpContext::flat("publish", channel);
        let command = Command::Publish {
            channel: channel.to_string(),
            payload: payload.to_vec(),
        };
        self.run(&ctx, &command, expect_count).await
    }

    // =========================================================================
    // Entry operations
    // =========================================================================

    /// Encode and store an entry under its identity key (or hash field)
    pub async fn store_entry<E: Entry>(&self, entry: &E) -> Result<bool> {
        let encoded = entry.encode(None)?;
        self.set(entry.identity_key(), storage_field(entry), &encoded)
            .await
    }

    /// Fetch and decode an entry; `missing_okay` yields `None` when absent
    pub async fn fetch_entry<E: Entry>(
        &self,
        key: &str,
        field: Option<&str>,
        missing_okay: bool,
    ) -> Result<Option<E>> {
        match self.get(key, field, missing_okay).await? {
            Some(bytes) => Ok(Some(E::decode(&bytes, Some(key), field)?)),
            None => Ok(None),
        }
    }

    /// Delete an entry from its storage location
    pub async fn delete_entry<E: Entry>(&self, entry: &E, check_exists: bool) -> Result<bool> {
        self.delete(entry.identity_key(), storage_field(entry), check_exists)
            .await
    }

    /// Fetch every entry within a hash-map container, partial-success
    pub async fn fetch_all_entries<E: Entry>(&self, key: &str) -> Result<FetchAll<E>> {
        let mut result = FetchAll::default();

        for field in self.hkeys(key).await? {
            match self.fetch_entry::<E>(key, Some(&field), true).await {
                Ok(Some(entry)) => {
                    result.entries.insert(field, entry);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        key = %key,
                        field = %field,
                        error = %err,
                        "failed to fetch entry during bulk enumeration"
                    );
                    result.failures.push((field, err));
                }
            }
        }

        Ok(result)
    }
}
