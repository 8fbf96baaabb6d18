//! Core type definitions for Canopy.
//!
//! This crate defines the fundamental, store-agnostic types used throughout
//! the mapping layer:
//! - Push keys (lexically ordered, time-increasing child identifiers)
//! - Observation kinds reported to child-event handlers
//! - The fixed ISO-8601 timestamp format used on the wire
//!
//! Entity types themselves belong to the application, not here.

mod event;
mod push_key;
mod timestamp;

pub use event::ObservationType;
pub use push_key::{PUSH_CHARS, PUSH_KEY_LEN, PushKeyGenerator, push_key_millis};
pub use timestamp::{format_timestamp, parse_timestamp};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid push key: {0}")]
    InvalidPushKey(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
