//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Once;

use serde::{Deserialize, Serialize};

use kvstow::{Config, Entry, FieldSpec, MemoryStore, Result, StowHelper, Value};

/// Minimal entry kind: one float attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub identity_key: String,
    pub field_name: Option<String>,
    pub value: f64,
}

impl Measurement {
    pub fn flat(key: &str, value: f64) -> Self {
        Self {
            identity_key: key.to_string(),
            field_name: None,
            value,
        }
    }

    pub fn hashed(key: &str, field: &str, value: f64) -> Self {
        Self {
            identity_key: key.to_string(),
            field_name: Some(field.to_string()),
            value,
        }
    }
}

impl Entry for Measurement {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::identity("identity_key"),
        FieldSpec::identity("field_name"),
        FieldSpec::attribute("value"),
    ];

    fn identity_key(&self) -> &str {
        &self.identity_key
    }

    fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "value" => Some(Value::Float(self.value)),
            _ => None,
        }
    }

    fn from_attributes(
        identity_key: String,
        field_name: Option<String>,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<Self> {
        Ok(Self {
            identity_key,
            field_name,
            value: attrs
                .get("value")
                .and_then(Value::as_float)
                .unwrap_or_default(),
        })
    }
}

/// Wider entry kind sharing `value` with `Measurement`, used for
/// schema-evolution tests. Carries an internal book-keeping flag that must
/// never round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub identity_key: String,
    pub field_name: Option<String>,
    pub value: f64,
    pub label: String,
    pub attempts: i64,
    #[serde(skip)]
    pub dirty: bool,
}

impl Job {
    pub fn hashed(key: &str, field: &str, value: f64, label: &str, attempts: i64) -> Self {
        Self {
            identity_key: key.to_string(),
            field_name: Some(field.to_string()),
            value,
            label: label.to_string(),
            attempts,
            dirty: false,
        }
    }
}

impl Entry for Job {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::identity("identity_key"),
        FieldSpec::identity("field_name"),
        FieldSpec::attribute("value"),
        FieldSpec::attribute("label"),
        FieldSpec::attribute("attempts"),
        FieldSpec::internal("dirty"),
    ];

    fn identity_key(&self) -> &str {
        &self.identity_key
    }

    fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "value" => Some(Value::Float(self.value)),
            "label" => Some(Value::Str(self.label.clone())),
            "attempts" => Some(Value::Int(self.attempts)),
            "dirty" => Some(Value::Bool(self.dirty)),
            _ => None,
        }
    }

    fn from_attributes(
        identity_key: String,
        field_name: Option<String>,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<Self> {
        Ok(Self {
            identity_key,
            field_name,
            value: attrs
                .get("value")
                .and_then(Value::as_float)
                .unwrap_or_default(),
            label: attrs
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            attempts: attrs
                .get("attempts")
                .and_then(Value::as_int)
                .unwrap_or_default(),
            dirty: false,
        })
    }
}

static TRACING: Once = Once::new();

/// Install the fmt subscriber once so RUST_LOG works during test runs
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Blocking helper over a fresh in-process store
pub fn memory_helper() -> (MemoryStore, StowHelper<MemoryStore>) {
    init_tracing();
    let store = MemoryStore::new();
    let helper = StowHelper::with_connector(store.clone(), &Config::default());
    (store, helper)
}
