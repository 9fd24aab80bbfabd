//! Canonical JSON encoding used as hash input.
//!
//! Object keys are emitted in sorted order at every depth and the output is
//! compact (no insignificant whitespace). Two values that compare equal as
//! JSON always encode to the same bytes, regardless of the insertion order of
//! their maps.

use serde_json::{Map, Value};

/// Rebuild `value` with every object's keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}

/// Canonical JSON text for `value`.
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

/// Canonical JSON bytes for `value`.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    canonical_json(value).into_bytes()
}
