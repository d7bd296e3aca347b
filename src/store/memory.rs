//! In-process store backend
//!
//! `MemoryStore` implements the full command surface against a process-local
//! map. Every connection drawn from the same store shares the same state, so
//! it doubles as an embedded backend and as the test double for the helpers.
//!
//! Kind enforcement lives here: a flat `SET` over an existing hash-map (or a
//! hash command over a flat key) is rejected with an error reply instead of
//! silently clobbering the entry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::{AsyncConnect, AsyncStoreConnection, Connect, StoreConnection};
use crate::error::Result;
use crate::pubsub::PubSubBroker;

use super::command::{kind, Command, Response};
use super::pattern;

/// What a key currently holds
#[derive(Debug, Clone)]
enum Slot {
    Flat(Vec<u8>),
    Hash(BTreeMap<String, Vec<u8>>),
}

struct Inner {
    data: RwLock<HashMap<String, Slot>>,
    broker: PubSubBroker,
}

/// Shared in-process store. Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with its own pub/sub broker
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(HashMap::new()),
                broker: PubSubBroker::new(),
            }),
        }
    }

    /// The broker `Publish` commands fan out through
    pub fn broker(&self) -> &PubSubBroker {
        &self.inner.broker
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.inner.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.read().is_empty()
    }

    /// Apply one command and produce its reply
    pub fn apply(&self, command: &Command) -> Response {
        match command {
            Command::Exists { key } => {
                let present = self.inner.data.read().contains_key(key);
                Response::Int(u64::from(present))
            }
            Command::Get { key } => match self.inner.data.read().get(key) {
                Some(Slot::Flat(value)) => Response::Bulk(value.clone()),
                Some(Slot::Hash(_)) => wrong_kind(key, kind::FLAT),
                None => Response::Nil,
            },
            Command::Set { key, value } => {
                if key.is_empty() {
                    return empty_key();
                }
                let mut data = self.inner.data.write();
                if matches!(data.get(key), Some(Slot::Hash(_))) {
                    return wrong_kind(key, kind::FLAT);
                }
                data.insert(key.clone(), Slot::Flat(value.clone()));
                Response::Ok
            }
            Command::Delete { key } => {
                let removed = self.inner.data.write().remove(key).is_some();
                Response::Int(u64::from(removed))
            }
            Command::HExists { key, field } => match self.inner.data.read().get(key) {
                Some(Slot::Hash(fields)) => Response::Int(u64::from(fields.contains_key(field))),
                Some(Slot::Flat(_)) => wrong_kind(key, kind::HASH),
                None => Response::Int(0),
            },
            Command::HGet { key, field } => match self.inner.data.read().get(key) {
                Some(Slot::Hash(fields)) => match fields.get(field) {
                    Some(value) => Response::Bulk(value.clone()),
                    None => Response::Nil,
                },
                Some(Slot::Flat(_)) => wrong_kind(key, kind::HASH),
                None => Response::Nil,
            },
            Command::HSet { key, field, value } => {
                if key.is_empty() || field.is_empty() {
                    return empty_key();
                }
                let mut data = self.inner.data.write();
                match data
                    .entry(key.clone())
                    .or_insert_with(|| Slot::Hash(BTreeMap::new()))
                {
                    Slot::Hash(fields) => {
                        let created = fields.insert(field.clone(), value.clone()).is_none();
                        Response::Int(u64::from(created))
                    }
                    Slot::Flat(_) => wrong_kind(key, kind::HASH),
                }
            }
            Command::HDel { key, field } => {
                let mut data = self.inner.data.write();
                match data.get_mut(key) {
                    Some(Slot::Hash(fields)) => {
                        let removed = fields.remove(field).is_some();
                        // An emptied hash-map disappears, matching store semantics
                        if fields.is_empty() {
                            data.remove(key);
                        }
                        Response::Int(u64::from(removed))
                    }
                    Some(Slot::Flat(_)) => wrong_kind(key, kind::HASH),
                    None => Response::Int(0),
                }
            }
            Command::HKeys { key } => match self.inner.data.read().get(key) {
                Some(Slot::Hash(fields)) => Response::List(fields.keys().cloned().collect()),
                Some(Slot::Flat(_)) => wrong_kind(key, kind::HASH),
                None => Response::List(Vec::new()),
            },
            Command::HGetAll { key } => match self.inner.data.read().get(key) {
                Some(Slot::Hash(fields)) => Response::Map(
                    fields
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect(),
                ),
                Some(Slot::Flat(_)) => wrong_kind(key, kind::HASH),
                None => Response::Map(Vec::new()),
            },
            Command::Keys { pattern } => {
                let data = self.inner.data.read();
                let mut keys: Vec<String> = data
                    .keys()
                    .filter(|key| pattern::matches(pattern, key))
                    .cloned()
                    .collect();
                keys.sort();
                Response::List(keys)
            }
            Command::Kind { key } => match self.inner.data.read().get(key) {
                Some(Slot::Flat(_)) => Response::kind(kind::FLAT),
                Some(Slot::Hash(_)) => Response::kind(kind::HASH),
                None => Response::Nil,
            },
            Command::Ping => Response::Bulk(b"PONG".to_vec()),
            Command::Publish { channel, payload } => {
                let delivered = self.inner.broker.publish(channel, payload.clone());
                Response::Int(delivered as u64)
            }
        }
    }
}

fn wrong_kind(key: &str, expected: &str) -> Response {
    Response::Error(format!(
        "WRONGTYPE key \"{key}\" does not hold a {expected} value"
    ))
}

fn empty_key() -> Response {
    Response::Error("Key and field names must be non-empty".to_string())
}

/// One borrowed view of a `MemoryStore`, playing the part of a connection
pub struct MemoryConnection {
    store: MemoryStore,
}

impl StoreConnection for MemoryConnection {
    fn execute(&mut self, command: &Command) -> Result<Response> {
        Ok(self.store.apply(command))
    }
}

impl AsyncStoreConnection for MemoryConnection {
    async fn execute(&mut self, command: &Command) -> Result<Response> {
        Ok(self.store.apply(command))
    }
}

impl Connect for MemoryStore {
    type Conn = MemoryConnection;

    fn connect(&self) -> Result<Self::Conn> {
        Ok(MemoryConnection {
            store: self.clone(),
        })
    }
}

impl AsyncConnect for MemoryStore {
    type Conn = MemoryConnection;

    async fn connect(&self) -> Result<Self::Conn> {
        Ok(MemoryConnection {
            store: self.clone(),
        })
    }
}
