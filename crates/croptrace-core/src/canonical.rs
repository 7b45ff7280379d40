//! Canonical field encoding and SHA-256 digests.
//!
//! Canonical form is compact JSON with:
//! - object keys sorted lexicographically, recursively
//! - integer-valued floats encoded as integers (`1.0` → `1`, `-0.0` → `0`)
//! - array order preserved
//!
//! Two mappings with the same key/value content canonicalize to identical
//! bytes no matter how they were built.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Decimal places kept for coordinates in the origin digest (~1.1 m).
pub const ORIGIN_COORDINATE_DECIMALS: i32 = 5;

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), sort_keys(v));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

fn normalize_numbers(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_numbers(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize_numbers).collect()),
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Value::Number(serde_json::Number::from(f as i64))
            }
            _ => value.clone(),
        },
        other => other.clone(),
    }
}

/// Canonical JSON text of any value.
pub fn canonical_json(value: &Value) -> String {
    // `Value`'s Display writes compact JSON and cannot fail.
    sort_keys(&normalize_numbers(value)).to_string()
}

/// Canonical bytes of a field mapping.
pub fn canonicalize(fields: &Map<String, Value>) -> Vec<u8> {
    canonical_json(&Value::Object(fields.clone())).into_bytes()
}

/// SHA-256 of `bytes`, lower-case hex (64 characters).
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Digest of a field mapping's canonical bytes.
pub fn digest_fields(fields: &Map<String, Value>) -> String {
    digest(&canonicalize(fields))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Privacy-preserving digest of a growing location.
///
/// Coordinates are rounded to five decimal places and the region is trimmed
/// and lower-cased, so repeated measurements of the same plot and casing
/// differences in the region name digest identically. The raw coordinates
/// cannot be recovered from the output.
pub fn origin_digest(latitude: f64, longitude: f64, region: &str) -> String {
    let mut fields = Map::new();
    fields.insert(
        "latitude".into(),
        number(round_to(latitude, ORIGIN_COORDINATE_DECIMALS)),
    );
    fields.insert(
        "longitude".into(),
        number(round_to(longitude, ORIGIN_COORDINATE_DECIMALS)),
    );
    fields.insert(
        "region".into(),
        Value::String(region.trim().to_lowercase()),
    );
    digest_fields(&fields)
}

fn number(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
