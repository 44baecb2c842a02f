//! Injection-safe configuration merging.
//!
//! Every merge copies only the keys present on either side and drops the
//! object-model keys in [`DENYLISTED_KEYS`], so configuration assembled from
//! untrusted JSON can never smuggle them into a merged result.

use serde_json::{Map, Value};

/// Keys that are never copied during a merge.
pub const DENYLISTED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Returns true if `key` must be dropped during a merge.
pub fn is_denylisted(key: &str) -> bool {
    DENYLISTED_KEYS.contains(&key)
}

/// Merges two JSON configuration documents.
///
/// Non-object inputs count as empty. `headers` objects present on both sides
/// are merged key by key (nested header maps the same way); every other key
/// is replaced wholesale by `over`.
///
/// ```rust
/// use integrations_http_client::config::merge::merge_values;
/// use serde_json::json;
///
/// let merged = merge_values(
///     &json!({"timeout": 1000, "headers": {"a": "1"}}),
///     &json!({"headers": {"b": "2"}, "__proto__": {"polluted": 1}}),
/// );
///
/// assert_eq!(merged, json!({"timeout": 1000, "headers": {"a": "1", "b": "2"}}));
/// ```
pub fn merge_values(base: &Value, over: &Value) -> Value {
    let mut merged = copy_object(base);

    if let Value::Object(over) = over {
        for (key, value) in over {
            if is_denylisted(key) {
                continue;
            }
            let combined = match (key.as_str(), merged.get(key), value) {
                ("headers", Some(Value::Object(existing)), Value::Object(incoming)) => {
                    Value::Object(merge_objects_deep(existing, incoming))
                }
                _ => sanitize(value),
            };
            merged.insert(key.clone(), combined);
        }
    }

    Value::Object(merged)
}

fn merge_objects_deep(base: &Map<String, Value>, over: &Map<String, Value>) -> Map<String, Value> {
    let mut merged: Map<String, Value> = base
        .iter()
        .filter(|(key, _)| !is_denylisted(key))
        .map(|(key, value)| (key.clone(), sanitize(value)))
        .collect();

    for (key, value) in over {
        if is_denylisted(key) {
            continue;
        }
        let combined = match (merged.get(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                Value::Object(merge_objects_deep(existing, incoming))
            }
            _ => sanitize(value),
        };
        merged.insert(key.clone(), combined);
    }

    merged
}

fn copy_object(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !is_denylisted(key))
            .map(|(key, value)| (key.clone(), sanitize(value)))
            .collect(),
        _ => Map::new(),
    }
}

/// Deep-copies a value with denylisted keys removed at every depth.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !is_denylisted(key))
                .map(|(key, value)| (key.clone(), sanitize(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}
