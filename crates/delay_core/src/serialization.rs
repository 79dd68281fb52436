//! Canonical JSON serialization helpers.
//!
//! Serializes structures with recursively sorted object keys and a fixed
//! two-space indent so saved predictors hash identically across runs and
//! platforms.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(key, val)| (key, sort_keys(val))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Pretty-printed JSON with every object's keys in lexicographic order
pub fn canonical_json_string<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&sort_keys(serde_json::to_value(value)?))
}

/// BLAKE3 digest of a JSON document's bytes, hex encoded
pub fn hash_json_hex(json: &str) -> String {
    hex::encode(blake3::hash(json.as_bytes()).as_bytes())
}

/// BLAKE3 digest of a value's canonical JSON, hex encoded
pub fn hash_canonical_hex<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: Serialize,
{
    Ok(hash_json_hex(&canonical_json_string(value)?))
}
