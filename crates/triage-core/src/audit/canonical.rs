//! Canonicalization for HMAC-signed audit payloads.
//!
//! `spec.md` §4.2: "canonical_json sorts keys lexicographically and
//! preserves Unicode literally". `serde_json` already emits Unicode
//! literally (it never escapes non-ASCII), so the only work here is
//! recursively re-ordering object keys into a `BTreeMap` before printing —
//! arrays keep their original order, numbers and strings are untouched.

use serde_json::Value;
use std::collections::BTreeMap;

/// Render `value` as compact JSON with all object keys sorted
/// lexicographically at every nesting depth.
pub fn canonical_json(value: &Value) -> String {
    serde_json::to_string(&sort_keys(value)).expect("canonicalized value always serializes")
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), sort_keys(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_nested_keys() {
        let value = json!({"b": 1, "a": {"d": 2, "c": 3}});
        assert_eq!(canonical_json(&value), r#"{"a":{"c":3,"d":2},"b":1}"#);
    }

    #[test]
    fn preserves_unicode_literally() {
        let value = json!({"text": "तत्काल ₹1000"});
        let out = canonical_json(&value);
        assert!(out.contains('₹'));
        assert!(out.contains('त'));
        assert!(!out.contains("\\u"));
    }

    #[test]
    fn preserves_array_order() {
        let value = json!({"items": [3, 1, 2]});
        assert_eq!(canonical_json(&value), r#"{"items":[3,1,2]}"#);
    }
}
