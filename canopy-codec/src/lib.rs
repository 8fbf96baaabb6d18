//! Value codec for Canopy.
//!
//! Converts between application documents and the store's native node
//! values (plain JSON: objects, arrays, strings, numbers, booleans, null):
//! - [`Document`]: a type's field table, the compile-time replacement for
//!   reflection; build entries with [`field!`]
//! - [`FieldCodec`]: per-Rust-type encode and coercion rules
//! - [`encode`] / [`decode`] / [`decode_list`]: whole-document conversion
//!
//! Encoding is sparse (null fields are omitted) and strict (values the store
//! cannot represent fail the whole call). Decoding is forgiving: unknown keys
//! are ignored and unparsable properties keep their default, so one bad
//! property never costs the rest of a record.

mod collections;
mod decode;
mod document;
mod encode;
mod error;
mod field_codec;
mod token;

pub use collections::{Bytes, IndexedMap, PresenceMap, RawJson};
pub use decode::{assign, decode, decode_keyed, decode_list};
pub use document::{Document, Field, FieldKind, Identifiable, kind_of};
pub use encode::{encode, encode_token};
pub use error::{CodecError, CodecResult};
pub use field_codec::{Coercion, FieldCodec, coerce_enum, text_form};
pub use token::Token;

/// The store's native representation of one node.
pub type NodeValue = serde_json::Value;

/// A keyed mapping of native values, as written to a node.
pub type NodeMap = serde_json::Map<String, serde_json::Value>;
