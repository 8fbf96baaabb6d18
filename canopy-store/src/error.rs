//! Error types for the store boundary.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a tree store backend can report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A path segment is empty of meaning or uses a reserved character.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A query combines operators the store cannot serve.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The backend could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// A payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The listener's event stream ended.
    #[error("listener closed: {0}")]
    ListenerClosed(String),

    /// A write was dropped by the backend before it reported an outcome.
    #[error("write abandoned before completion")]
    Abandoned,

    /// No async runtime was available to drive the operation.
    #[error("runtime error: {0}")]
    Runtime(String),
}
