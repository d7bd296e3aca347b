//! Helper surface
//!
//! `OpContext` names each attempted command for error attribution; the
//! blocking and non-blocking helpers are parallel call paths over the same
//! dispatch contract.

pub mod blocking;
pub mod nonblocking;

use std::collections::BTreeMap;

use crate::entry::Entry;
use crate::error::{Result, StowError};
use crate::store::Response;

pub use blocking::StowHelper;
pub use nonblocking::AsyncStowHelper;

/// Diagnostic description of one attempted command
///
/// The formatted op name (e.g. `hget(key="beep", field="boop")`) plus the
/// attempted key/field travel into `Connection` / `Store` errors so
/// failures can be attributed without guessing.
#[derive(Debug, Clone)]
pub struct OpContext {
    pub op: String,
    pub key: Option<String>,
    pub field: Option<String>,
}

impl OpContext {
    /// Context for a flat-key command
    pub fn flat(op: &str, key: &str) -> Self {
        Self {
            op: format!("{op}(key=\"{key}\")"),
            key: Some(key.to_string()),
            field: None,
        }
    }

    /// Context for a hash-map command
    pub fn hash(op: &str, key: &str, field: &str) -> Self {
        Self {
            op: format!("{op}(key=\"{key}\", field=\"{field}\")"),
            key: Some(key.to_string()),
            field: Some(field.to_string()),
        }
    }

    /// Context for a command with no key argument
    pub fn bare(op: &str) -> Self {
        Self {
            op: format!("{op}()"),
            key: None,
            field: None,
        }
    }

    /// Context for a pattern-driven command
    pub fn pattern(op: &str, pattern: &str) -> Self {
        Self {
            op: format!("{op}(pattern=\"{pattern}\")"),
            key: None,
            field: None,
        }
    }
}

/// Result of a bulk hash-map fetch: decoded entries keyed by field name,
/// plus the per-field failures that did not abort the enumeration.
pub struct FetchAll<E> {
    pub entries: BTreeMap<String, E>,
    pub failures: Vec<(String, StowError)>,
}

impl<E> Default for FetchAll<E> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            failures: Vec::new(),
        }
    }
}

impl<E> FetchAll<E> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// Response interpretation (shared by both execution modes)
// =============================================================================

pub(crate) fn expect_ok(response: Response) -> Result<()> {
    match response {
        Response::Ok => Ok(()),
        Response::Error(message) => Err(StowError::Rejected { message }),
        other => unexpected("Ok", &other),
    }
}

pub(crate) fn expect_bool(response: Response) -> Result<bool> {
    match response {
        Response::Int(value) => Ok(value > 0),
        Response::Error(message) => Err(StowError::Rejected { message }),
        other => unexpected("Int", &other),
    }
}

pub(crate) fn expect_count(response: Response) -> Result<u64> {
    match response {
        Response::Int(value) => Ok(value),
        Response::Error(message) => Err(StowError::Rejected { message }),
        other => unexpected("Int", &other),
    }
}

pub(crate) fn expect_bulk(response: Response) -> Result<Option<Vec<u8>>> {
    match response {
        Response::Bulk(data) => Ok(Some(data)),
        Response::Nil => Ok(None),
        Response::Error(message) => Err(StowError::Rejected { message }),
        other => unexpected("Bulk", &other),
    }
}

pub(crate) fn expect_list(response: Response) -> Result<Vec<String>> {
    match response {
        Response::List(items) => Ok(items),
        Response::Error(message) => Err(StowError::Rejected { message }),
        other => unexpected("List", &other),
    }
}

pub(crate) fn expect_map(response: Response) -> Result<Vec<(String, Vec<u8>)>> {
    match response {
        Response::Map(pairs) => Ok(pairs),
        Response::Error(message) => Err(StowError::Rejected { message }),
        other => unexpected("Map", &other),
    }
}

fn unexpected<T>(expected: &str, got: &Response) -> Result<T> {
    Err(StowError::Protocol(format!(
        "Unexpected response: expected {expected}, got {:?}",
        got.status()
    )))
}

/// Hash field the entry stores under; an empty field name means flat
/// placement, same as `Entry::is_hashmap`.
pub(crate) fn storage_field<E: Entry>(entry: &E) -> Option<&str> {
    entry.field_name().filter(|name| !name.is_empty())
}

pub(crate) fn not_found(key: &str, field: Option<&str>) -> StowError {
    StowError::NotFound {
        key: key.to_string(),
        field: field.map(str::to_string),
    }
}
