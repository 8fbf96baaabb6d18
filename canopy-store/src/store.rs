//! The tree store abstraction.
//!
//! A [`TreeStore`] is a path-addressed tree of JSON nodes that can merge
//! writes, answer ordered child queries, and push child-level changes to
//! listeners. Data providers are written against this trait so that any
//! backend can sit behind them.

use crate::change::ChildSink;
use crate::error::StoreResult;
use crate::query::Query;
use crate::snapshot::Snapshot;
use crate::write::WriteHandle;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

/// Identifies one registered listener within its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// A hierarchical, push-notifying store of JSON nodes.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Short name of the backend, for logs.
    fn backend_name(&self) -> &'static str;

    /// Generates a fresh child key for `path`.
    ///
    /// Keys sort lexically in generation order and never repeat.
    fn push_key(&self, path: &str) -> String;

    /// Merges `values` into the node at `path`.
    ///
    /// Each entry replaces the child of the same key; children not named
    /// are left as they are. A null entry removes that child.
    fn update(&self, path: &str, values: Map<String, Value>) -> WriteHandle;

    /// Removes the node at `path`. Removing an absent node succeeds.
    fn remove(&self, path: &str) -> WriteHandle;

    /// Reads the node at `path`, or the children `query` selects.
    async fn get(&self, path: &str, query: &Query) -> StoreResult<Snapshot>;

    /// Starts delivering changes to the children `query` selects.
    ///
    /// The children already present are delivered first as additions.
    fn listen(&self, path: &str, query: &Query, sink: ChildSink) -> StoreResult<ListenerId>;

    /// Stops a listener. Unknown ids are ignored.
    fn unlisten(&self, id: ListenerId);
}
