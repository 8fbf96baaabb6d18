//! Error types for data providers.

use canopy_codec::CodecError;
use canopy_store::StoreError;
use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced to provider callers.
///
/// Per-record decode problems never show up here: they are logged and the
/// record is skipped.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The entity could not be encoded; nothing was written.
    #[error("encode failed: {0}")]
    Codec(#[from] CodecError),

    /// The store rejected or failed the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A filter named a field the entity type does not have.
    #[error("{entity} has no field named {field:?}")]
    MissingField { entity: &'static str, field: String },

    /// A collection path is already served by a provider of another type.
    #[error("{path:?} is served by a provider of {actual}, not {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A collection path is empty or malformed.
    #[error("invalid collection path: {0:?}")]
    InvalidPath(String),
}
