//! Error types for the codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding a document.
///
/// Property-level decode problems are not errors; they are logged and the
/// property keeps its default. Only the cases below abort a call.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value has no representation in the store.
    #[error("encoding of {kind} values is not supported (field {field})")]
    Unsupported { field: String, kind: &'static str },

    /// NaN and infinities have no JSON representation.
    #[error("field {field} holds a non-finite float")]
    NonFiniteFloat { field: String },

    /// An enum field names a variant the type does not have.
    #[error("field {field}: unknown variant {value:?}")]
    UnknownVariant { field: String, value: String },
}
