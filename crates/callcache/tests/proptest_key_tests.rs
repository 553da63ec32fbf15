//! Property-based tests for canonical encoding and key derivation.
//!
//! - Determinism: equal values always encode and hash identically
//! - Order invariance: object key insertion order never affects the key
//! - Sensitivity: changing endpoint or version changes the key

use callcache::{canonical, derive_key};
use proptest::prelude::*;
use serde_json::{Map, Value};

// =============================================================================
// Strategies
// =============================================================================

/// Arbitrary JSON values a few levels deep
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-8000i32..8000).prop_map(|n| Value::from(f64::from(n) / 8.0)),
        "[a-zA-Z0-9 _\\-é]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z_]{1,8}", inner), 0..6).prop_map(|pairs| {
                let mut map = Map::new();
                for (k, v) in pairs {
                    map.insert(k, v);
                }
                Value::Object(map)
            }),
        ]
    })
}

fn endpoint_strategy() -> impl Strategy<Value = String> {
    "v[0-9]/[a-z]{1,10}".prop_map(String::from)
}

/// Rebuild every object with its keys inserted in reverse order
fn reverse_insertion_order(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.reverse();
            let mut rebuilt = Map::new();
            for (k, v) in entries {
                rebuilt.insert(k.clone(), reverse_insertion_order(v));
            }
            Value::Object(rebuilt)
        }
        Value::Array(items) => Value::Array(items.iter().map(reverse_insertion_order).collect()),
        other => other.clone(),
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Contract: encoding is a pure function of the value
    #[test]
    fn encoding_is_deterministic(value in json_strategy()) {
        let a = canonical::to_vec(&value).expect("encode");
        let b = canonical::to_vec(&value.clone()).expect("encode clone");
        prop_assert_eq!(a, b);
    }

    /// Contract: canonical output parses back to an equal value
    #[test]
    fn encoding_parses_back(value in json_strategy()) {
        let bytes = canonical::to_vec(&value).expect("encode");
        let parsed: Value = serde_json::from_slice(&bytes).expect("parse");
        prop_assert_eq!(parsed, value);
    }

    /// Contract: canonical output contains no whitespace outside strings
    #[test]
    fn encoding_has_no_whitespace_outside_strings(value in json_strategy()) {
        let text = canonical::to_string(&value).expect("encode");
        let mut in_string = false;
        let mut escaped = false;
        for c in text.chars() {
            if in_string {
                match (escaped, c) {
                    (true, _) => escaped = false,
                    (false, '\\') => escaped = true,
                    (false, '"') => in_string = false,
                    _ => {}
                }
            } else if c == '"' {
                in_string = true;
            } else {
                prop_assert!(!c.is_whitespace(), "whitespace in {}", text);
            }
        }
    }

    /// Contract: key insertion order never changes the derived key
    #[test]
    fn key_ignores_insertion_order(
        endpoint in endpoint_strategy(),
        payload in json_strategy(),
        version in proptest::option::of("[a-z0-9.]{1,8}"),
    ) {
        let reordered = reverse_insertion_order(&payload);
        let k1 = derive_key(&endpoint, &payload, version.as_deref()).expect("derive");
        let k2 = derive_key(&endpoint, &reordered, version.as_deref()).expect("derive reordered");
        prop_assert_eq!(k1, k2);
    }

    /// Contract: a different endpoint gives a different key
    #[test]
    fn key_depends_on_endpoint(
        a in endpoint_strategy(),
        b in endpoint_strategy(),
        payload in json_strategy(),
    ) {
        prop_assume!(a != b);
        let ka = derive_key(&a, &payload, None).expect("derive a");
        let kb = derive_key(&b, &payload, None).expect("derive b");
        prop_assert_ne!(ka, kb);
    }

    /// Contract: a different non-empty version gives a different key
    #[test]
    fn key_depends_on_version(
        endpoint in endpoint_strategy(),
        payload in json_strategy(),
        version in "[a-z0-9.]{1,8}",
    ) {
        let unversioned = derive_key(&endpoint, &payload, None).expect("derive");
        let versioned = derive_key(&endpoint, &payload, Some(version.as_str())).expect("derive versioned");
        prop_assert_ne!(unversioned, versioned);
    }
}
