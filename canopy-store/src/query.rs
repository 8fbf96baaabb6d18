//! Ordered child queries.
//!
//! A [`Query`] selects a window of a node's children: it orders them (by key
//! or by one named child field), optionally bounds them by value, and
//! optionally keeps only the first or last `n`. Every backend evaluates the
//! same window; [`Query::window`] is the reference evaluation.

use crate::error::{StoreError, StoreResult};
use serde_json::Value;
use std::cmp::Ordering;

/// How children are ordered before range and limit operators apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OrderBy {
    /// No explicit order. Children come back in key order and no range
    /// operator may be used.
    #[default]
    Unordered,
    /// Lexical order of child keys.
    Key,
    /// Order of the value stored under the named field of each child.
    Child(String),
}

/// A query against the children of one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub order_by: OrderBy,
    pub equal_to: Option<Value>,
    pub start_at: Option<Value>,
    pub end_at: Option<Value>,
    pub limit_to_first: Option<u32>,
    pub limit_to_last: Option<u32>,
}

impl Query {
    /// A query that returns the node as stored.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by_key(mut self) -> Self {
        self.order_by = OrderBy::Key;
        self
    }

    pub fn order_by_child(mut self, field: impl Into<String>) -> Self {
        self.order_by = OrderBy::Child(field.into());
        self
    }

    pub fn equal_to(mut self, value: impl Into<Value>) -> Self {
        self.equal_to = Some(value.into());
        self
    }

    pub fn start_at(mut self, value: impl Into<Value>) -> Self {
        self.start_at = Some(value.into());
        self
    }

    pub fn end_at(mut self, value: impl Into<Value>) -> Self {
        self.end_at = Some(value.into());
        self
    }

    pub fn limit_to_first(mut self, n: u32) -> Self {
        self.limit_to_first = Some(n);
        self
    }

    pub fn limit_to_last(mut self, n: u32) -> Self {
        self.limit_to_last = Some(n);
        self
    }

    /// Whether the query selects the node as stored, with no operators.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Whether children of the result can change relative order when
    /// their values change.
    pub fn orders_by_value(&self) -> bool {
        matches!(self.order_by, OrderBy::Child(_))
    }

    /// Rejects operator combinations the store cannot serve.
    pub fn validate(&self) -> StoreResult<()> {
        if self.limit_to_first.is_some() && self.limit_to_last.is_some() {
            return Err(invalid("limit_to_first and limit_to_last are exclusive"));
        }
        if self.limit_to_first == Some(0) || self.limit_to_last == Some(0) {
            return Err(invalid("limits must be positive"));
        }
        if self.equal_to.is_some() && (self.start_at.is_some() || self.end_at.is_some()) {
            return Err(invalid("equal_to cannot be combined with start_at or end_at"));
        }

        let bounds = [&self.equal_to, &self.start_at, &self.end_at];
        match &self.order_by {
            OrderBy::Unordered if bounds.iter().any(|b| b.is_some()) => {
                Err(invalid("range operators need an order"))
            }
            OrderBy::Key if bounds.iter().flat_map(|b| b.as_ref()).any(|v| !v.is_string()) => {
                Err(invalid("key bounds must be strings"))
            }
            OrderBy::Child(field) if crate::path::segments(field)?.is_empty() => {
                Err(invalid("order_by_child needs a field name"))
            }
            _ => Ok(()),
        }
    }

    /// Evaluates the query against `node`, returning the selected children
    /// in query order.
    ///
    /// A node that is not a mapping has no children.
    pub fn window(&self, node: &Value) -> Vec<(String, Value)> {
        let Some(children) = node.as_object() else {
            return Vec::new();
        };

        let mut entries: Vec<(String, Value)> = children
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        entries.sort_by(|a, b| self.compare_children(a, b));

        entries.retain(|(key, value)| self.in_range(key, value));

        if let Some(n) = self.limit_to_first {
            entries.truncate(n as usize);
        }
        if let Some(n) = self.limit_to_last {
            let skip = entries.len().saturating_sub(n as usize);
            entries.drain(..skip);
        }
        entries
    }

    /// Orders two children under this query.
    pub fn compare_children(&self, a: &(String, Value), b: &(String, Value)) -> Ordering {
        match &self.order_by {
            OrderBy::Unordered | OrderBy::Key => a.0.cmp(&b.0),
            OrderBy::Child(field) => {
                compare_values(child_value(&a.1, field), child_value(&b.1, field))
                    .then_with(|| a.0.cmp(&b.0))
            }
        }
    }

    fn in_range(&self, key: &str, value: &Value) -> bool {
        let key_value;
        let ordered = match &self.order_by {
            OrderBy::Unordered => return true,
            OrderBy::Key => {
                key_value = Value::String(key.to_string());
                &key_value
            }
            OrderBy::Child(field) => child_value(value, field),
        };

        if let Some(eq) = &self.equal_to {
            return compare_values(ordered, eq) == Ordering::Equal;
        }
        if let Some(start) = &self.start_at {
            if compare_values(ordered, start) == Ordering::Less {
                return false;
            }
        }
        if let Some(end) = &self.end_at {
            if compare_values(ordered, end) == Ordering::Greater {
                return false;
            }
        }
        true
    }
}

fn invalid(reason: &str) -> StoreError {
    StoreError::InvalidQuery(reason.to_string())
}

/// The value stored under `field` (a `/`-separated path) of `child`, or
/// null when absent.
pub fn child_value<'a>(child: &'a Value, field: &str) -> &'a Value {
    field
        .split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(child, |node, segment| node.get(segment))
        .unwrap_or(&Value::Null)
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) | Value::Object(_) => 5,
    }
}

/// Store ordering of child values: null, false, true, numbers ascending,
/// strings lexically, then mappings and lists (which compare equal).
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
