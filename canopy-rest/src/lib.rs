//! Realtime Database REST backend for Canopy.
//!
//! [`RestTree`] implements [`canopy_store::TreeStore`] over the database's
//! REST API: JSON documents over HTTP for reads and writes, and
//! Server-Sent Events for listeners.
//!
//! # Example
//!
//! ```no_run
//! use canopy_rest::{RestConfig, RestTree};
//!
//! let tree = RestTree::new(RestConfig {
//!     database_url: "https://my-app.firebaseio.com".to_string(),
//!     auth_token: Some("secret".to_string()),
//!     ..Default::default()
//! })
//! .unwrap();
//! ```

mod config;
pub mod sse;
mod tree;

pub use config::RestConfig;
pub use sse::{SseEvent, SseParser, StreamEvent};
pub use tree::{RestTree, query_params};
