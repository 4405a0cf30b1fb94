//! JSON merge patch (RFC 7386).

use serde_json::Value;

/// Apply `patch` to `target` in place with JSON-merge-patch semantics:
/// objects merge recursively, `null` removes the key, anything else
/// replaces the existing value.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(map) = target {
                for (key, value) in entries {
                    if value.is_null() {
                        map.remove(key);
                    } else {
                        merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
                    }
                }
            }
        }
        _ => {
            *target = patch.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recursive_merge_preserves_siblings() {
        let mut doc = json!({"settings": {"theme": "dark", "members": {"a": 1}}});
        merge_patch(&mut doc, &json!({"settings": {"members": {"b": 2}}}));
        assert_eq!(doc["settings"]["theme"], "dark");
        assert_eq!(doc["settings"]["members"]["a"], 1);
        assert_eq!(doc["settings"]["members"]["b"], 2);
    }

    #[test]
    fn test_null_removes_key() {
        let mut doc = json!({"a": 1, "b": 2});
        merge_patch(&mut doc, &json!({"a": null}));
        assert_eq!(doc, json!({"b": 2}));
    }

    #[test]
    fn test_scalar_replaces() {
        let mut doc = json!({"a": {"deep": true}});
        merge_patch(&mut doc, &json!({"a": 5}));
        assert_eq!(doc, json!({"a": 5}));
    }
}
