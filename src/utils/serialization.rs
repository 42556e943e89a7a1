// src/utils/serialization.rs
//! Deterministic canonicalization of JSON values for signing.

use serde::Serialize;
use serde_json::{Map, Value};

/// Returns a copy of `value` with every object's keys in lexicographic order.
///
/// Arrays keep their element order and scalars are returned untouched, so
/// numbers serialize exactly as the input carried them. The output is a fixed
/// point: canonicalizing it again yields the same value.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(fields.len());
            for key in keys {
                out.insert(key.clone(), canonicalize(&fields[key.as_str()]));
            }
            Value::Object(out)
        }
        scalar => scalar.clone(),
    }
}

/// Serializes `data` as whitespace-free canonical JSON.
///
/// Two semantically identical inputs produce byte-identical strings regardless
/// of the key order they were built with. This is the byte string that gets
/// signed for issuance proofs.
pub fn canonical_string<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(data)?;
    serde_json::to_string(&canonicalize(&value))
}
