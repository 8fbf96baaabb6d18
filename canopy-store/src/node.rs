//! Helpers for editing a JSON tree in place.
//!
//! The tree holds no explicit nulls: writing null removes a node, and a
//! mapping left without children disappears with it.

use serde_json::{Map, Value};

/// The node at `segments` below `root`, or null.
pub fn node_at<'a>(root: &'a Value, segments: &[String]) -> &'a Value {
    segments
        .iter()
        .try_fold(root, |node, segment| node.get(segment.as_str()))
        .unwrap_or(&Value::Null)
}

/// Writes `value` at `segments`, creating parents and pruning parents left
/// empty.
pub fn set_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = prune(value).unwrap_or(Value::Null);
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };

    if rest.is_empty() {
        match prune(value) {
            Some(value) => {
                map.insert(first.clone(), value);
            }
            None => {
                map.remove(first);
            }
        }
    } else {
        let child = map.entry(first.clone()).or_insert(Value::Null);
        set_at(child, rest, value);
        if child.is_null() {
            map.remove(first);
        }
    }

    if map.is_empty() {
        *node = Value::Null;
    }
}

/// Drops nulls and empty containers; the tree has no explicit null.
pub fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| prune(child).map(|child| (key, child)))
                .collect();
            (!pruned.is_empty()).then_some(Value::Object(pruned))
        }
        Value::Array(items) if items.is_empty() => None,
        other => Some(other),
    }
}
