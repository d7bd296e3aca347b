//! Blocking helper
//!
//! Each operation runs to completion on the calling thread: acquire a
//! connection, execute one store command (or a short existence-check +
//! command sequence), translate any failure into the error taxonomy, and
//! return the connection to the pool. Safe to share across threads.

use std::collections::BTreeMap;

use crate::client::{Connect, ConnectionPool, StoreConnection, TcpConnector};
use crate::config::Config;
use crate::entry::Entry;
use crate::error::{Result, StowError};
use crate::store::Command;

use super::{
    expect_bool, expect_bulk, expect_count, expect_list, expect_map, expect_ok, not_found,
    storage_field, FetchAll, OpContext,
};

/// Blocking helper over a pooled store connection
pub struct StowHelper<C: Connect> {
    pool: ConnectionPool<C>,
}

impl StowHelper<TcpConnector> {
    /// Build a TCP-backed helper from a config
    pub fn connect(config: Config) -> Result<Self> {
        let connector = TcpConnector::new(config.clone())?;
        Ok(Self::with_connector(connector, &config))
    }
}

impl<C: Connect> StowHelper<C> {
    /// Build a helper over any connect capability (e.g. a `MemoryStore`)
    pub fn with_connector(connector: C, config: &Config) -> Self {
        Self {
            pool: ConnectionPool::new(connector, config.max_idle, config.max_total),
        }
    }

    /// The underlying pool (shared, externally owned semantics)
    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    // =========================================================================
    // Operation wrapper
    // =========================================================================

    /// Acquire a connection, run one unit of work, normalize failures
    ///
    /// Pool acquisition failures surface as `Connection`; failures inside
    /// the operation surface as `Store`, both tagged with the op name and
    /// the attempted key/field. The connection is returned to the pool on
    /// every exit path; transport-level failures discard it instead.
    pub fn with_connection<T>(
        &self,
        ctx: &OpContext,
        operation: impl FnOnce(&mut C::Conn) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.pool.acquire().map_err(|err| StowError::Connection {
            op: ctx.op.clone(),
            source: Box::new(err),
        })?;

        match operation(conn.connection()) {
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
    pub fn exists(&self, key: &str, field: Option<&str>) -> Result<bool> {
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

        self.with_connection(&ctx, |conn| expect_bool(conn.execute(&command)?))
    }

    /// Fetch raw bytes for a key or hash-map field
    ///
    /// Existence-checks first. An absent entry raises `NotFound` unless
    /// `missing_okay` is set, in which case `None` is returned. A fetch
    /// that comes back empty after a positive existence check lost a race
    /// with a concurrent delete and is treated the same as absent.
    pub fn get(&self, key: &str, field: Option<&str>, missing_okay: bool) -> Result<Option<Vec<u8>>> {
        if !self.exists(key, field)? {
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

        match self.with_connection(&ctx, |conn| expect_bulk(conn.execute(&command)?))? {
            Some(bytes) => Ok(Some(bytes)),
            None if missing_okay => Ok(None),
            None => Err(not_found(key, field)),
        }
    }

    /// Store raw bytes under a key or hash-map field
    ///
    /// Overwrites are logged and allowed. Returns true when the entry was
    /// newly created (a hash-map field overwrite reports false, matching
    /// the store's own reply).
    pub fn set(&self, key: &str, field: Option<&str>, value: &[u8]) -> Result<bool> {
        if self.exists(key, field)? {
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
                self.with_connection(&ctx, |conn| expect_bool(conn.execute(&command)?))
            }
            None => {
                let ctx = OpContext::flat("set", key);
                let command = Command::Set {
                    key: key.to_string(),
                    value: value.to_vec(),
                };
                self.with_connection(&ctx, |conn| expect_ok(conn.execute(&command)?))?;
                Ok(true)
            }
        }
    }

    /// Delete a key or hash-map field
    ///
    /// With `check_exists`, deleting an absent entry is a logged no-op
    /// returning false, never an error.
    pub fn delete(&self, key: &str, field: Option<&str>, check_exists: bool) -> Result<bool> {
        if check_exists && !self.exists(key, field)? {
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

        self.with_connection(&ctx, |conn| expect_bool(conn.execute(&command)?))
    }

    /// Enumerate the field names of a hash-map
    pub fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        let ctx = OpContext::flat("hkeys", key);
        let command = Command::HKeys {
            key: key.to_string(),
        };
        self.with_connection(&ctx, |conn| expect_list(conn.execute(&command)?))
    }

    /// Fetch every field of a hash-map as raw bytes
    pub fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let ctx = OpContext::flat("hgetall", key);
        let command = Command::HGetAll {
            key: key.to_string(),
        };
        let pairs = self.with_connection(&ctx, |conn| expect_map(conn.execute(&command)?))?;
        Ok(pairs.into_iter().collect())
    }

    /// Enumerate keys matching a glob pattern (`*` when omitted)
    pub fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let pattern = pattern.unwrap_or("*");
        let ctx = OpContext::pattern("keys", pattern);
        let command = Command::Keys {
            pattern: pattern.to_string(),
        };
        self.with_connection(&ctx, |conn| expect_list(conn.execute(&command)?))
    }

    /// Probe whether a key holds a flat value or a hash-map
    pub fn kind(&self, key: &str) -> Result<Option<String>> {
        let ctx = OpContext::flat("kind", key);
        let command = Command::Kind {
            key: key.to_string(),
        };
        let bytes = self.with_connection(&ctx, |conn| expect_bulk(conn.execute(&command)?))?;
        Ok(bytes.map(|data| String::from_utf8_lossy(&data).into_owned()))
    }

    /// Health check
    pub fn ping(&self) -> Result<()> {
        let ctx = OpContext::bare("ping");
        self.with_connection(&ctx, |conn| expect_bulk(conn.execute(&Command::Ping)?))?;
        Ok(())
    }

    /// Publish a payload to a channel; returns the delivery count
    pub fn publish(&self, channel: &str, payload: &[u8]) -> Result<u64> {
        let ctx = OpContext::flat("publish", channel);
        let command = Command::Publish {
            channel: channel.to_string(),
            payload: payload.to_vec(),
        };
        self.with_connection(&ctx, |conn| expect_count(conn.execute(&command)?))
    }

    // =========================================================================
    // Entry operations
    // =========================================================================

    /// Encode and store an entry under its identity key (or hash field)
    pub fn store_entry<E: Entry>(&self, entry: &E) -> Result<bool> {
        let encoded = entry.encode(None)?;
        self.set(entry.identity_key(), storage_field(entry), &encoded)
    }

    /// Fetch and decode an entry
    ///
    /// With `missing_okay`, an absent entry yields `None` instead of
    /// `NotFound`.
    pub fn fetch_entry<E: Entry>(
        &self,
        key: &str,
        field: Option<&str>,
        missing_okay: bool,
    ) -> Result<Option<E>> {
        match self.get(key, field, missing_okay)? {
            Some(bytes) => Ok(Some(E::decode(&bytes, Some(key), field)?)),
            None => Ok(None),
        }
    }

    /// Delete an entry from its storage location
    pub fn delete_entry<E: Entry>(&self, entry: &E, check_exists: bool) -> Result<bool> {
        self.delete(entry.identity_key(), storage_field(entry), check_exists)
    }

    /// Fetch every entry within a hash-map container
    ///
    /// Partial-success semantics: a field that fails to fetch or decode is
    /// reported in `failures` without aborting the enumeration.
    pub fn fetch_all_entries<E: Entry>(&self, key: &str) -> Result<FetchAll<E>> {
        let mut result = FetchAll::default();

        for field in self.hkeys(key)? {
            match self.fetch_entry::<E>(key, Some(&field), true) {
                Ok(Some(entry)) => {
                    result.entries.insert(field, entry);
                }
                // Deleted while enumerating; skip silently
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
