//! Entry encode/decode benchmarks.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde::{Deserialize, Serialize};

use kvstow::{Entry, FieldSpec, Result, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Reading {
    identity_key: String,
    field_name: Option<String>,
    value: f64,
    label: String,
    attempts: i64,
}

impl Entry for Reading {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::identity("identity_key"),
        FieldSpec::identity("field_name"),
        FieldSpec::attribute("value"),
        FieldSpec::attribute("label"),
        FieldSpec::attribute("attempts"),
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
        })
    }
}

fn sample() -> Reading {
    Reading {
        identity_key: "bench:container".to_string(),
        field_name: Some("bench-field".to_string()),
        value: 40.66,
        label: "benchmark reading with a medium-length label".to_string(),
        attempts: 12,
    }
}

fn bench_encode(c: &mut Criterion) {
    let entry = sample();

    c.bench_function("encode_as_record", |b| {
        b.iter(|| black_box(&entry).encode(Some(false)).unwrap())
    });

    c.bench_function("encode_as_mapping", |b| {
        b.iter(|| black_box(&entry).encode(Some(true)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let entry = sample();
    let record = entry.encode(Some(false)).unwrap();
    let mapping = entry.encode(Some(true)).unwrap();

    c.bench_function("decode_from_record", |b| {
        b.iter(|| {
            Reading::decode(black_box(&record), Some("bench:container"), Some("bench-field"))
                .unwrap()
        })
    });

    c.bench_function("decode_from_mapping", |b| {
        b.iter(|| {
            Reading::decode(black_box(&mapping), Some("bench:container"), Some("bench-field"))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
