//! Canonical JSON encoding
//!
//! Produces a byte-for-byte deterministic serialization of JSON-representable
//! data: object keys sorted recursively, no insignificant whitespace. The same
//! encoding is used for cache key derivation and for the files written to disk,
//! so persisted artifacts stay diffable.

use crate::{Error, Result};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Serializes the wrapped value through its [`fmt::Display`] impl.
///
/// Use this for values that have no native JSON shape (paths, ids, timestamps)
/// so they take part in encoding as a stable string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Displayed<T>(pub T);

impl<T: fmt::Display> Serialize for Displayed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

/// Convert any serializable value into a JSON [`Value`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::encoding(e.to_string()))
}

/// Rebuild a value so that every object lists its keys in sorted order.
///
/// `serde_json` may be compiled with `preserve_order` by another crate in the
/// dependency graph, so key order is never left to the map implementation.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Encode a value to canonical JSON bytes.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = canonicalize(&to_value(value)?);
    serde_json::to_vec(&value).map_err(|e| Error::encoding(e.to_string()))
}

/// Encode a value to a canonical JSON string.
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = canonicalize(&to_value(value)?);
    serde_json::to_string(&value).map_err(|e| Error::encoding(e.to_string()))
}
