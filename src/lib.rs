//! # kvstow
//!
//! A serialization convenience layer over a remote key-value store:
//! - Typed "entry" records with a static field schema
//! - Storage under flat keys or as fields within hash-maps
//! - Pooled blocking and non-blocking helpers with one error taxonomy
//! - Pattern-based pub/sub with background listeners (peripheral)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Entry Protocol                            │
//! │        (encode / decode, store / fetch / delete)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Operation Wrapper                            │
//! │      (acquire connection, one command, error tagging)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Blocking   │          │ Non-blocking│
//!   │ TCP / pool  │          │ tokio / pool│
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        ▼
//!   ┌─────────────────────────────────────┐
//!   │      Store (remote or in-process)   │
//!   └─────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use serde::{Deserialize, Serialize};
//!
//! use kvstow::{
//!     Config, Entry, FieldSpec, MemoryStore, Result, StowHelper, Value,
//! };
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Measurement {
//!     identity_key: String,
//!     field_name: Option<String>,
//!     value: f64,
//! }
//!
//! impl Entry for Measurement {
//!     const FIELDS: &'static [FieldSpec] = &[
//!         FieldSpec::identity("identity_key"),
//!         FieldSpec::identity("field_name"),
//!         FieldSpec::attribute("value"),
//!     ];
//!
//!     fn identity_key(&self) -> &str {
//!         &self.identity_key
//!     }
//!
//!     fn field_name(&self) -> Option<&str> {
//!         self.field_name.as_deref()
//!     }
//!
//!     fn attribute(&self, name: &str) -> Option<Value> {
//!         match name {
//!             "value" => Some(Value::Float(self.value)),
//!             _ => None,
//!         }
//!     }
//!
//!     fn from_attributes(
//!         identity_key: String,
//!         field_name: Option<String>,
//!         attrs: &BTreeMap<String, Value>,
//!     ) -> Result<Self> {
//!         Ok(Self {
//!             identity_key,
//!             field_name,
//!             value: attrs.get("value").and_then(Value::as_float).unwrap_or_default(),
//!         })
//!     }
//! }
//!
//! let store = MemoryStore::new();
//! let helper = StowHelper::with_connector(store, &Config::default());
//!
//! let reading = Measurement {
//!     identity_key: "blarg".to_string(),
//!     field_name: None,
//!     value: 5.7,
//! };
//! helper.store_entry(&reading).unwrap();
//!
//! let fetched: Measurement = helper.fetch_entry("blarg", None, false).unwrap().unwrap();
//! assert_eq!(fetched.value, 5.7);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod value;
pub mod entry;
pub mod store;
pub mod client;
pub mod helper;
pub mod pubsub;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, ConfigBuilder, URI_SCHEME};
pub use entry::{Entry, FieldKind, FieldSpec, FIELD_NAME_ATTR, IDENTITY_KEY_ATTR};
pub use error::{Result, StowError};
pub use helper::{AsyncStowHelper, FetchAll, OpContext, StowHelper};
pub use pubsub::{Listener, Message, PubSubBroker, Subscription};
pub use store::MemoryStore;
pub use value::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvstow
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
