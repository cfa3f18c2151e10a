//! Value-tree operations shared by the resolver.
//!
//! The parsed config file, the defaults map, and override values all use
//! `serde_json::Value` as the common mapping/sequence/scalar node type;
//! YAML input deserializes into it directly.

use heck::ToSnakeCase;
use serde_json::{Map, Value};

/// Walk `tree` by descending one dot-delimited segment at a time.
///
/// Mapping keys match case-insensitively. Segments that parse as an
/// unsigned integer index into sequences. Out-of-range indexes and
/// descent through a scalar yield `None` rather than an error.
pub fn lookup_path<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = tree;
    for segment in key.split('.') {
        match current {
            Value::Object(map) => {
                current = get_case_insensitive(map, segment)?;
            }
            Value::Array(seq) => {
                let index: usize = segment.parse().ok()?;
                current = seq.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Mapping lookup where an exact match wins over a case-folded one.
fn get_case_insensitive<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Expand a flat `key.path -> value` map into a nested mapping tree.
///
/// Later entries for the same path win. A leaf written through an
/// existing scalar replaces it with a mapping.
pub fn expand_dotted(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
    let mut root = Map::new();
    for (key, value) in entries {
        insert_path(&mut root, &key, value);
    }
    Value::Object(root)
}

fn insert_path(map: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            map.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(nested) = entry {
                insert_path(nested, rest, value);
            }
        }
    }
}

/// Deep-merge two value trees, with `overlay` taking precedence.
///
/// Objects merge recursively; arrays and scalars are replaced entirely.
/// A null overlay preserves the base value (null means "not specified",
/// which is what a bare `key:` line in YAML parses to).
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Recursively fold mapping keys to snake_case.
///
/// Lets ordinary snake_case serde struct fields match camelCase or
/// mixed-case file keys (`listenAddress` -> `listen_address`).
pub fn fold_keys_snake_case(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut folded = Map::new();
            for (key, nested) in map {
                folded.insert(key.to_snake_case(), fold_keys_snake_case(nested));
            }
            Value::Object(folded)
        }
        Value::Array(seq) => Value::Array(seq.into_iter().map(fold_keys_snake_case).collect()),
        other => other,
    }
}

/// Human-readable name of a value's shape, for coercion errors.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Coerce a scalar to a string. Mappings and sequences do not coerce.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a scalar to a bool. Strings accept the usual spellings;
/// numbers are true when nonzero.
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

/// Coerce a scalar to an integer. Strings parse; floats truncate;
/// bools map to 1/0.
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Coerce to a list of strings.
///
/// Sequences coerce element-wise (failing if any element is not a
/// scalar). Bare strings split on commas when present, so environment
/// values like `a,b,c` read back as a list; otherwise they become a
/// single-element list.
pub fn as_string_slice(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(seq) => seq.iter().map(as_string).collect(),
        Value::String(s) => {
            if s.contains(',') {
                Some(
                    s.split(',')
                        .map(|part| part.trim().to_string())
                        .filter(|part| !part.is_empty())
                        .collect(),
                )
            } else {
                Some(vec![s.clone()])
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested_mapping() {
        let tree = json!({"metrics": {"listenAddress": "0.0.0.0", "listenPort": "9090"}});
        assert_eq!(
            lookup_path(&tree, "metrics.listenAddress"),
            Some(&json!("0.0.0.0"))
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let tree = json!({"Metrics": {"listenPort": "9090"}});
        assert_eq!(
            lookup_path(&tree, "metrics.LISTENPORT"),
            Some(&json!("9090"))
        );
    }

    #[test]
    fn test_lookup_sequence_index() {
        let tree = json!({"backends": ["a", "b", "c"]});
        assert_eq!(lookup_path(&tree, "backends.0"), Some(&json!("a")));
        assert_eq!(lookup_path(&tree, "backends.2"), Some(&json!("c")));
    }

    #[test]
    fn test_lookup_sequence_out_of_range_is_absent() {
        let tree = json!({"backends": ["a", "b", "c"]});
        assert_eq!(lookup_path(&tree, "backends.99"), None);
    }

    #[test]
    fn test_lookup_through_scalar_is_absent() {
        let tree = json!({"logLevel": "debug"});
        assert_eq!(lookup_path(&tree, "logLevel.nested"), None);
    }

    #[test]
    fn test_lookup_non_numeric_index_is_absent() {
        let tree = json!({"backends": ["a"]});
        assert_eq!(lookup_path(&tree, "backends.first"), None);
    }

    #[test]
    fn test_expand_dotted_builds_nested_tree() {
        let tree = expand_dotted([
            ("metrics.listenport".to_string(), json!("9090")),
            ("os".to_string(), json!("centos")),
        ]);
        assert_eq!(
            tree,
            json!({"metrics": {"listenport": "9090"}, "os": "centos"})
        );
    }

    #[test]
    fn test_expand_dotted_leaf_through_scalar_replaces() {
        let tree = expand_dotted([
            ("a".to_string(), json!(1)),
            ("a.b".to_string(), json!(2)),
        ]);
        assert_eq!(tree, json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_deep_merge_objects_field_by_field() {
        let base = json!({"server": {"host": "localhost", "port": 8080}});
        let overlay = json!({"server": {"port": 9000}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"server": {"host": "localhost", "port": 9000}})
        );
    }

    #[test]
    fn test_deep_merge_arrays_replaced() {
        let base = json!({"items": [1, 2, 3]});
        let overlay = json!({"items": [4]});
        assert_eq!(deep_merge(base, overlay), json!({"items": [4]}));
    }

    #[test]
    fn test_deep_merge_null_overlay_preserves_base() {
        let base = json!({"a": 1});
        assert_eq!(deep_merge(base.clone(), Value::Null), base);
    }

    #[test]
    fn test_fold_keys_snake_case() {
        let tree = json!({"listenAddress": "x", "nested": {"MaxRetries": 3}});
        assert_eq!(
            fold_keys_snake_case(tree),
            json!({"listen_address": "x", "nested": {"max_retries": 3}})
        );
    }

    #[test]
    fn test_as_int_coercions() {
        assert_eq!(as_int(&json!(7)), Some(7));
        assert_eq!(as_int(&json!("7")), Some(7));
        assert_eq!(as_int(&json!(" 42 ")), Some(42));
        assert_eq!(as_int(&json!(true)), Some(1));
        assert_eq!(as_int(&json!("not a number")), None);
        assert_eq!(as_int(&json!([1, 2])), None);
    }

    #[test]
    fn test_as_bool_coercions() {
        assert_eq!(as_bool(&json!(true)), Some(true));
        assert_eq!(as_bool(&json!("true")), Some(true));
        assert_eq!(as_bool(&json!("0")), Some(false));
        assert_eq!(as_bool(&json!(1)), Some(true));
        assert_eq!(as_bool(&json!("maybe")), None);
    }

    #[test]
    fn test_as_string_slice_from_sequence() {
        assert_eq!(
            as_string_slice(&json!(["a", "b", "c"])),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(as_string_slice(&json!([{"k": 1}])), None);
    }

    #[test]
    fn test_as_string_slice_splits_commas() {
        assert_eq!(
            as_string_slice(&json!("a, b,c")),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(as_string_slice(&json!("solo")), Some(vec!["solo".to_string()]));
    }
}
