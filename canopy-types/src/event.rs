//! Observation kinds for child-event handlers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a child of an observed collection.
///
/// There is no reordering notification: observations are only
/// opened on key-ordered or unordered queries, where a child cannot move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    /// A child entered the observed range (including the initial sync).
    ChildAdded,
    /// A child's value changed.
    ChildChanged,
    /// A child left the observed range. Only its key is known.
    ChildRemoved,
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChildAdded => "child_added",
            Self::ChildChanged => "child_changed",
            Self::ChildRemoved => "child_removed",
        };
        f.write_str(name)
    }
}
