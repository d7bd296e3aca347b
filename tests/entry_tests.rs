//! Entry protocol tests: schema filtering, encode/decode envelopes,
//! checksum validation, identity recovery, and schema evolution.

mod common;

use std::collections::BTreeMap;

use serde::Serialize;

use kvstow::{Entry, StowError, Value, FIELD_NAME_ATTR, IDENTITY_KEY_ATTR};

use common::{Job, Measurement};

/// Serialize-only mirror of the wire envelope so tests can craft payloads
/// the public API refuses to produce (e.g. mappings without identity).
#[derive(Serialize)]
enum Envelope {
    Mapping(BTreeMap<String, Value>),
    #[allow(dead_code)]
    Record(()),
}

fn frame(envelope: &Envelope) -> Vec<u8> {
    let payload = bincode::serialize(envelope).unwrap();
    let mut bytes = crc32fast::hash(&payload).to_be_bytes().to_vec();
    bytes.extend_from_slice(&payload);
    bytes
}

// =============================================================================
// Schema
// =============================================================================

#[test]
fn entry_fields_follow_declaration_order() {
    assert_eq!(
        Job::entry_fields(true, true),
        vec!["identity_key", "field_name", "value", "label", "attempts", "dirty"]
    );
    assert_eq!(
        Job::entry_fields(false, false),
        vec!["value", "label", "attempts"]
    );
    assert_eq!(
        Measurement::entry_fields(true, false),
        vec!["identity_key", "field_name", "value"]
    );
}

#[test]
fn hashmap_detection_requires_non_empty_field() {
    assert!(!Measurement::flat("blarg", 5.7).is_hashmap());
    assert!(Measurement::hashed("beep", "boop", 40.66).is_hashmap());

    let mut odd = Measurement::flat("blarg", 5.7);
    odd.field_name = Some(String::new());
    assert!(!odd.is_hashmap());
}

#[test]
fn as_attributes_embeds_identity_on_request() {
    let entry = Measurement::hashed("beep", "boop", 40.66);

    let with_identity = entry.as_attributes(true, false);
    assert_eq!(
        with_identity.get(IDENTITY_KEY_ATTR),
        Some(&Value::Str("beep".to_string()))
    );
    assert_eq!(
        with_identity.get(FIELD_NAME_ATTR),
        Some(&Value::Str("boop".to_string()))
    );
    assert_eq!(with_identity.get("value"), Some(&Value::Float(40.66)));

    let bare = entry.as_attributes(false, false);
    assert_eq!(bare.len(), 1);
    assert!(bare.contains_key("value"));
}

// =============================================================================
// Round-trips
// =============================================================================

#[test]
fn flat_entry_round_trips_as_record() {
    let entry = Measurement::flat("blarg", 5.7);
    let bytes = entry.encode(None).unwrap();

    let back = Measurement::decode(&bytes, Some("blarg"), None).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn hashed_entry_round_trips_as_mapping() {
    let entry = Measurement::hashed("beep", "boop", 40.66);
    let bytes = entry.encode(None).unwrap();

    let back = Measurement::decode(&bytes, Some("beep"), Some("boop")).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn mapping_payload_recovers_identity_without_fallbacks() {
    let entry = Measurement::hashed("beep", "boop", 40.66);
    let bytes = entry.encode(Some(true)).unwrap();

    // Identity travels inside the mapping, so no fallbacks are needed.
    let back = Measurement::decode(&bytes, None, None).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn fallback_identity_wins_over_embedded() {
    let entry = Measurement::hashed("beep", "boop", 40.66);
    let bytes = entry.encode(Some(true)).unwrap();

    let back = Measurement::decode(&bytes, Some("renamed"), Some("moved")).unwrap();
    assert_eq!(back.identity_key, "renamed");
    assert_eq!(back.field_name.as_deref(), Some("moved"));
    assert_eq!(back.value, 40.66);
}

#[test]
fn empty_fallbacks_defer_to_embedded_identity() {
    let entry = Measurement::hashed("beep", "boop", 40.66);
    let bytes = entry.encode(Some(true)).unwrap();

    let back = Measurement::decode(&bytes, Some(""), Some("")).unwrap();
    assert_eq!(back.identity_key, "beep");
    assert_eq!(back.field_name.as_deref(), Some("boop"));
}

#[test]
fn hashed_entry_can_force_record_form() {
    let entry = Measurement::hashed("beep", "boop", 40.66);
    let bytes = entry.encode(Some(false)).unwrap();

    let back = Measurement::decode(&bytes, None, None).unwrap();
    assert_eq!(back, entry);
}

// =============================================================================
// Schema evolution
// =============================================================================

#[test]
fn unknown_attributes_are_ignored_on_decode() {
    let wide = Job::hashed("queue", "job-1", 2.5, "resize", 3);
    let bytes = wide.encode(Some(true)).unwrap();

    // A narrower reader keeps the attributes it knows and drops the rest.
    let narrow = Measurement::decode(&bytes, Some("queue"), Some("job-1")).unwrap();
    assert_eq!(narrow.value, 2.5);
}

#[test]
fn missing_attributes_take_defaults_on_decode() {
    let narrow = Measurement::hashed("queue", "job-1", 2.5);
    let bytes = narrow.encode(Some(true)).unwrap();

    let wide = Job::decode(&bytes, Some("queue"), Some("job-1")).unwrap();
    assert_eq!(wide.value, 2.5);
    assert_eq!(wide.label, "");
    assert_eq!(wide.attempts, 0);
}

#[test]
fn internal_fields_never_round_trip() {
    let mut job = Job::hashed("queue", "job-1", 2.5, "resize", 3);
    job.dirty = true;

    // Visible when explicitly requested, absent from the stored mapping.
    assert!(job.as_attributes(true, true).contains_key("dirty"));
    assert!(!job.as_attributes(true, false).contains_key("dirty"));

    let bytes = job.encode(Some(true)).unwrap();
    let back = Job::decode(&bytes, None, None).unwrap();
    assert!(!back.dirty);
}

// =============================================================================
// Malformed payloads
// =============================================================================

#[test]
fn decode_rejects_truncated_payload() {
    let err = Measurement::decode(&[0x01, 0x02], Some("blarg"), None).unwrap_err();
    assert!(matches!(err, StowError::Decode { .. }));
}

#[test]
fn decode_rejects_corrupted_payload() {
    let entry = Measurement::flat("blarg", 5.7);
    let mut bytes = entry.encode(None).unwrap();

    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let err = Measurement::decode(&bytes, Some("blarg"), None).unwrap_err();
    match err {
        StowError::Decode { message, .. } => assert!(message.contains("checksum")),
        other => panic!("expected Decode, got {other:?}"),
    }
}

#[test]
fn decode_rejects_garbage_after_valid_checksum() {
    let payload = b"not an envelope".to_vec();
    let mut bytes = crc32fast::hash(&payload).to_be_bytes().to_vec();
    bytes.extend_from_slice(&payload);

    let err = Measurement::decode(&bytes, Some("blarg"), None).unwrap_err();
    assert!(matches!(err, StowError::Decode { source: Some(_), .. }));
}

#[test]
fn mapping_without_identity_is_rejected() {
    let mut attrs = BTreeMap::new();
    attrs.insert("value".to_string(), Value::Float(1.0));
    let bytes = frame(&Envelope::Mapping(attrs));

    let err = Measurement::decode(&bytes, None, None).unwrap_err();
    assert!(matches!(err, StowError::MissingIdentity));
}

// =============================================================================
// Diagnostics
// =============================================================================

#[test]
fn dump_lists_attributes_in_schema_order() {
    let entry = Measurement::hashed("beep", "boop", 40.66);
    let text = entry.dump(true);

    assert!(text.contains("Entry for key \"beep\""));
    assert!(text.contains("hash field \"boop\""));
    assert!(text.contains("identity_key = "));
    assert!(text.contains("value = "));

    let bare = entry.dump(false);
    assert!(!bare.contains("identity_key = "));
    assert!(bare.contains("value = "));
}
