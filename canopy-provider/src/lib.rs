//! Typed data providers for Canopy.
//!
//! A [`DataProvider`] maps one collection of a tree store to a Rust entity
//! type: create-or-upsert, point and filtered reads, newest-first paging,
//! and a single live observation of child events. [`TreeDataProvider`]
//! implements it over any [`canopy_store::TreeStore`];
//! [`DataProviderFactory`] hands out one provider per collection path.
//!
//! # Example
//!
//! ```
//! use canopy_codec::{Document, Field, Identifiable, field};
//! use canopy_provider::{DataProvider, DataProviderFactory};
//! use canopy_store::MemoryTree;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default)]
//! struct Note {
//!     id: String,
//!     title: String,
//! }
//!
//! impl Identifiable for Note {
//!     fn id(&self) -> &str { &self.id }
//!     fn set_id(&mut self, id: String) { self.id = id; }
//! }
//!
//! impl Document for Note {
//!     const FIELDS: &'static [Field<Self>] = &[field!(Note, id), field!(Note, title)];
//! }
//!
//! # tokio_test::block_on(async {
//! let factory = DataProviderFactory::new(Arc::new(MemoryTree::new()));
//! let notes = factory.get_provider::<Note>("notes").unwrap();
//!
//! let mut note = Note { title: "groceries".into(), ..Default::default() };
//! let id = notes.create(&mut note).unwrap();
//!
//! let stored = notes.read(&id).await.unwrap().unwrap();
//! assert_eq!(stored.title, "groceries");
//! # });
//! ```

mod error;
mod factory;
mod observation;
mod provider;
mod tree_provider;

pub use error::{ProviderError, ProviderResult};
pub use factory::{DataProviderFactory, Observable};
pub use observation::ListenerGuard;
pub use provider::{ChildHandler, DataProvider, PendingWrite};
pub use tree_provider::TreeDataProvider;
