//! Tree store boundary for Canopy.
//!
//! The data providers talk to a store through the [`TreeStore`] trait:
//! merge writes, removals, one-shot reads with ordered child [`Query`]s,
//! and listeners that receive [`ChildChange`]s. This crate also ships the
//! [`MemoryTree`] backend and the helpers every backend shares:
//! [`Query::window`] to evaluate a query locally and [`diff_children`] to
//! turn two evaluations into child events.
//!
//! # Example
//!
//! ```
//! use canopy_store::{MemoryTree, Query, TreeStore};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let tree = MemoryTree::new();
//! let values = json!({ "name": "Ada" }).as_object().cloned().unwrap();
//! tree.update("users/u1", values).wait().await.unwrap();
//!
//! let snapshot = tree.get("users", &Query::new().order_by_key()).await.unwrap();
//! assert_eq!(snapshot.children_count(), 1);
//! # });
//! ```

mod change;
mod error;
mod memory;
pub mod node;
pub mod path;
mod query;
mod snapshot;
mod store;
mod write;

pub use change::{ChildChange, ChildSink, diff_children, initial_changes};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryTree;
pub use query::{OrderBy, Query, child_value, compare_values};
pub use snapshot::Snapshot;
pub use store::{ListenerId, TreeStore};
pub use write::{WriteCompleter, WriteHandle};
