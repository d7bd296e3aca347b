//! Entry protocol
//!
//! The encode/decode contract for structured records. An entry names its
//! storage location with an identity key and, when it lives inside a
//! hash-map, a field name. Its remaining attributes are described by a
//! static, declaration-ordered schema so dumps and round-trips are
//! reproducible without runtime reflection.
//!
//! The serialized form is a crc32 checksum followed by a bincode envelope
//! holding either the whole record ("as record") or an attribute mapping
//! ("as mapping"). Hash-map entries default to the mapping form, flat
//! entries to the record form; the envelope is self-describing, so decode
//! accepts both regardless of the caller's default.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StowError};
use crate::value::Value;

/// Reserved attribute name carrying the identity key in mapping payloads
pub const IDENTITY_KEY_ATTR: &str = "identity_key";

/// Reserved attribute name carrying the hash field name in mapping payloads
pub const FIELD_NAME_ATTR: &str = "field_name";

/// Classification of one schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Names the storage location (`identity_key` / `field_name`)
    Identity,

    /// Ordinary user attribute, round-tripped through the store
    Attribute,

    /// Book-keeping only, never round-tripped
    Internal,
}

/// One field in an entry's static schema
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn identity(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Identity,
        }
    }

    pub const fn attribute(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Attribute,
        }
    }

    pub const fn internal(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Internal,
        }
    }
}

/// Owned decode envelope. Variant order is the wire tag; keep it in sync
/// with `PayloadRef`.
#[derive(Deserialize)]
enum Payload<E> {
    Mapping(BTreeMap<String, Value>),
    Record(E),
}

/// Borrowed encode envelope mirroring `Payload`
#[derive(Serialize)]
enum PayloadRef<'a, E> {
    Mapping(BTreeMap<String, Value>),
    Record(&'a E),
}

/// A serializable record stored under a flat key or a hash-map field
pub trait Entry: Serialize + DeserializeOwned + Sized {
    /// Static schema in declaration order, identity fields included
    const FIELDS: &'static [FieldSpec];

    /// Identity key naming the record (or its hash-map container).
    /// Never empty.
    fn identity_key(&self) -> &str;

    /// Hash-map field name; `None` for flat records
    fn field_name(&self) -> Option<&str>;

    /// Look up one user attribute by schema name
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Rebuild a record from an attribute mapping
    ///
    /// Attributes missing from the mapping take the concrete type's
    /// defaults; extra keys have already been filtered by `decode`.
    fn from_attributes(
        identity_key: String,
        field_name: Option<String>,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<Self>;

    /// True when this record is stored as a hash-map field
    fn is_hashmap(&self) -> bool {
        self.field_name().is_some_and(|name| !name.is_empty())
    }

    /// Schema names filtered by classification, in declaration order
    fn entry_fields(include_identity: bool, include_internal: bool) -> Vec<&'static str> {
        Self::FIELDS
            .iter()
            .filter(|field| match field.kind {
                FieldKind::Identity => include_identity,
                FieldKind::Internal => include_internal,
                FieldKind::Attribute => true,
            })
            .map(|field| field.name)
            .collect()
    }

    /// Flatten the record into an attribute mapping
    fn as_attributes(
        &self,
        include_identity: bool,
        include_internal: bool,
    ) -> BTreeMap<String, Value> {
        let mut attrs = BTreeMap::new();

        for name in Self::entry_fields(include_identity, include_internal) {
            if name == IDENTITY_KEY_ATTR {
                attrs.insert(name.to_string(), Value::Str(self.identity_key().to_string()));
            } else if name == FIELD_NAME_ATTR {
                attrs.insert(
                    name.to_string(),
                    self.field_name().map(str::to_string).into(),
                );
            } else if let Some(value) = self.attribute(name) {
                attrs.insert(name.to_string(), value);
            }
        }

        attrs
    }

    /// Serialize the entry to bytes
    ///
    /// `as_mapping: None` defaults to the mapping form for hash-map
    /// entries and the whole-record form for flat entries.
    fn encode(&self, as_mapping: Option<bool>) -> Result<Vec<u8>> {
        let as_mapping = as_mapping.unwrap_or_else(|| self.is_hashmap());

        let payload = if as_mapping {
            bincode::serialize(&PayloadRef::<Self>::Mapping(self.as_attributes(true, false)))
        } else {
            bincode::serialize(&PayloadRef::Record(self))
        };

        let payload = payload.map_err(|source| StowError::Encode {
            key: self.identity_key().to_string(),
            source,
        })?;

        let mut encoded = Vec::with_capacity(4 + payload.len());
        encoded.extend_from_slice(&crc32fast::hash(&payload).to_be_bytes());
        encoded.extend_from_slice(&payload);
        Ok(encoded)
    }

    /// Deserialize an entry from bytes
    ///
    /// Mapping payloads recover identity metadata from the supplied
    /// fallbacks first, then from the mapping's reserved attributes.
    /// Unknown attribute names are ignored with a diagnostic rather than
    /// an error, so records tolerate schema evolution in both directions.
    fn decode(
        bytes: &[u8],
        fallback_key: Option<&str>,
        fallback_field: Option<&str>,
    ) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(StowError::Decode {
                message: format!("payload of {} bytes is shorter than the checksum", bytes.len()),
                source: None,
            });
        }

        let expected = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let payload = &bytes[4..];
        let actual = crc32fast::hash(payload);
        if expected != actual {
            return Err(StowError::Decode {
                message: format!(
                    "checksum mismatch (stored {expected:#010x}, computed {actual:#010x})"
                ),
                source: None,
            });
        }

        let decoded: Payload<Self> =
            bincode::deserialize(payload).map_err(|source| StowError::Decode {
                message: "payload is neither an attribute mapping nor a whole record".to_string(),
                source: Some(source),
            })?;

        match decoded {
            Payload::Record(entry) => Ok(entry),
            Payload::Mapping(mut attrs) => {
                let embedded_key = attrs
                    .remove(IDENTITY_KEY_ATTR)
                    .and_then(|value| value.as_str().map(str::to_string));
                let embedded_field = attrs
                    .remove(FIELD_NAME_ATTR)
                    .and_then(|value| value.as_str().map(str::to_string))
                    .filter(|name| !name.is_empty());

                let identity_key = fallback_key
                    .map(str::to_string)
                    .filter(|key| !key.is_empty())
                    .or_else(|| embedded_key.filter(|key| !key.is_empty()))
                    .ok_or(StowError::MissingIdentity)?;
                let field_name = fallback_field
                    .map(str::to_string)
                    .filter(|name| !name.is_empty())
                    .or(embedded_field);

                attrs.retain(|name, _| {
                    let known = Self::FIELDS.iter().any(|field| field.name == name);
                    if !known {
                        tracing::debug!(
                            attribute = %name,
                            "ignoring unknown attribute while decoding entry"
                        );
                    }
                    known
                });

                Self::from_attributes(identity_key, field_name, &attrs)
            }
        }
    }

    /// Diagnostic text listing the entry's attributes in schema order
    fn dump(&self, include_identity: bool) -> String {
        let mut out = format!("Entry for key \"{}\"", self.identity_key());
        if let Some(field) = self.field_name() {
            out.push_str(&format!(", hash field \"{field}\""));
        }

        for name in Self::entry_fields(include_identity, false) {
            let value = if name == IDENTITY_KEY_ATTR {
                Value::Str(self.identity_key().to_string())
            } else if name == FIELD_NAME_ATTR {
                self.field_name().map(str::to_string).into()
            } else {
                self.attribute(name).unwrap_or(Value::Null)
            };
            out.push_str(&format!("\n  {name} = {value}"));
        }

        out
    }
}
