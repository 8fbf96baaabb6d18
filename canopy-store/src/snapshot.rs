use serde_json::{Map, Value};

/// The result of a one-shot read.
///
/// For a plain read the value is the node as stored; for a query it is a
/// mapping holding the selected children. Null means nothing is there.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    key: String,
    value: Value,
}

impl Snapshot {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Builds a query result from selected children.
    pub fn from_children(key: impl Into<String>, children: Vec<(String, Value)>) -> Self {
        let value = if children.is_empty() {
            Value::Null
        } else {
            Value::Object(children.into_iter().collect::<Map<_, _>>())
        };
        Self::new(key, value)
    }

    /// Last segment of the read path; empty for the root.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Number of children, zero for scalars.
    pub fn children_count(&self) -> usize {
        self.value.as_object().map_or(0, Map::len)
    }
}
