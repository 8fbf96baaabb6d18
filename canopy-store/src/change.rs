//! Child-level change notifications.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One change to a child of a listened node.
///
/// `prev_key` is the key of the child that precedes this one in query
/// order, or `None` when it is first.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildChange {
    Added {
        key: String,
        value: Value,
        prev_key: Option<String>,
    },
    Changed {
        key: String,
        value: Value,
        prev_key: Option<String>,
    },
    Removed {
        key: String,
    },
    Moved {
        key: String,
        value: Value,
        prev_key: Option<String>,
    },
}

impl ChildChange {
    /// Key of the child the change is about.
    pub fn key(&self) -> &str {
        match self {
            Self::Added { key, .. }
            | Self::Changed { key, .. }
            | Self::Removed { key }
            | Self::Moved { key, .. } => key,
        }
    }
}

/// Receives the changes of one listener, in delivery order.
pub type ChildSink = Arc<dyn Fn(ChildChange) + Send + Sync>;

/// Computes the child events that turn window `old` into window `new`.
///
/// Both windows are in query order. Removals come first, then additions and
/// value changes in the new order. A changed child is also reported as
/// moved when its predecessor among the children present in both windows
/// differs; under key order that never happens.
pub fn diff_children(old: &[(String, Value)], new: &[(String, Value)]) -> Vec<ChildChange> {
    let old_values: HashMap<&str, &Value> =
        old.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let new_keys: HashSet<&str> = new.iter().map(|(k, _)| k.as_str()).collect();

    let mut changes: Vec<ChildChange> = old
        .iter()
        .filter(|(key, _)| !new_keys.contains(key.as_str()))
        .map(|(key, _)| ChildChange::Removed { key: key.clone() })
        .collect();

    let old_prev = predecessors(old, |key| new_keys.contains(key));
    let new_prev = predecessors(new, |key| old_values.contains_key(key));

    let mut prev_key: Option<&str> = None;
    for (key, value) in new {
        let prev = prev_key.map(str::to_string);
        match old_values.get(key.as_str()) {
            None => changes.push(ChildChange::Added {
                key: key.clone(),
                value: value.clone(),
                prev_key: prev,
            }),
            Some(previous) if *previous != value => {
                changes.push(ChildChange::Changed {
                    key: key.clone(),
                    value: value.clone(),
                    prev_key: prev.clone(),
                });
                if old_prev.get(key.as_str()) != new_prev.get(key.as_str()) {
                    changes.push(ChildChange::Moved {
                        key: key.clone(),
                        value: value.clone(),
                        prev_key: prev,
                    });
                }
            }
            Some(_) => {}
        }
        prev_key = Some(key.as_str());
    }
    changes
}

/// Maps each kept key to the kept key before it.
fn predecessors<'a>(
    window: &'a [(String, Value)],
    keep: impl Fn(&str) -> bool,
) -> HashMap<&'a str, Option<&'a str>> {
    let mut out = HashMap::new();
    let mut prev = None;
    for (key, _) in window.iter().filter(|(key, _)| keep(key.as_str())) {
        out.insert(key.as_str(), prev);
        prev = Some(key.as_str());
    }
    out
}

/// The Added events that replay a window to a new listener.
pub fn initial_changes(window: &[(String, Value)]) -> Vec<ChildChange> {
    diff_children(&[], window)
}
