//! Container field types: lists, nested documents, index-keyed maps,
//! presence maps, and the two opaque types the store cannot hold.

use crate::{Coercion, Document, FieldCodec, FieldKind, NodeValue, Token, decode};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Binary payload. Cannot be stored: encoding fails, decoding is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl FieldCodec for Bytes {
    const KIND: FieldKind = FieldKind::Unsupported;

    fn to_token(&self) -> Token {
        Token::Bytes(self.0.clone())
    }

    fn coerce(_value: &NodeValue, _field: &str) -> Coercion<Self> {
        Coercion::Skip("unsupported field kind: bytes".to_string())
    }
}

/// Pre-serialized text. Cannot be stored: encoding fails, decoding is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawJson(pub String);

impl FieldCodec for RawJson {
    const KIND: FieldKind = FieldKind::Unsupported;

    fn to_token(&self) -> Token {
        Token::Raw(self.0.clone())
    }

    fn coerce(_value: &NodeValue, _field: &str) -> Coercion<Self> {
        Coercion::Skip("unsupported field kind: raw".to_string())
    }
}

/// Positions and values of a list-shaped native value.
///
/// The store hands back arrays, or objects with integer keys when the
/// array is sparse; both are accepted. Non-integer keys are ignored.
fn list_items(value: &NodeValue) -> Option<Vec<(u32, &NodeValue)>> {
    match value {
        NodeValue::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (i as u32, item))
                .collect(),
        ),
        NodeValue::Object(map) => {
            let mut items: Vec<(u32, &NodeValue)> = map
                .iter()
                .filter_map(|(key, item)| key.parse::<u32>().ok().map(|i| (i, item)))
                .collect();
            items.sort_by_key(|(i, _)| *i);
            Some(items)
        }
        _ => None,
    }
}

fn document_token<D: Document>(doc: &D) -> Token {
    Token::Object(
        D::FIELDS
            .iter()
            .map(|f| (f.name.to_string(), f.token(doc)))
            .collect(),
    )
}

/// A homogeneous list. Elements that fail to coerce are omitted.
impl<T: FieldCodec> FieldCodec for Vec<T> {
    const KIND: FieldKind = FieldKind::List;

    fn to_token(&self) -> Token {
        Token::Array(self.iter().map(FieldCodec::to_token).collect())
    }

    fn coerce(value: &NodeValue, field: &str) -> Coercion<Self> {
        let Some(items) = list_items(value) else {
            return Coercion::Skip("expected a list".to_string());
        };

        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items {
            if item.is_null() {
                continue;
            }
            match T::coerce(item, field) {
                Coercion::Set(element) => out.push(element),
                Coercion::Clear => out.extend(T::empty()),
                Coercion::Skip(reason) => {
                    debug!(field, index, %reason, "omitting list element");
                }
                Coercion::Reject(err) => return Coercion::Reject(err),
            }
        }
        Coercion::Set(out)
    }

    fn empty() -> Option<Self> {
        Some(Vec::new())
    }
}

/// A nested document, stored as a mapping.
impl<D: Document> FieldCodec for Box<D> {
    const KIND: FieldKind = FieldKind::Document;

    fn to_token(&self) -> Token {
        document_token(self.as_ref())
    }

    fn coerce(value: &NodeValue, _field: &str) -> Coercion<Self> {
        match decode::<D>(value) {
            Ok(Some(doc)) => Coercion::Set(Box::new(doc)),
            Ok(None) => Coercion::Skip("expected a mapping".to_string()),
            Err(err) => Coercion::Reject(err),
        }
    }
}

/// Sub-entities keyed by list position.
///
/// Stored as a mapping from position to document. Read back from either a
/// list (position is the key) or an integer-keyed mapping; elements that
/// fail to decode are omitted, and a value with no decodable element reads
/// as null.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedMap<T>(pub BTreeMap<u32, T>);

impl<T> Default for IndexedMap<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<T> Deref for IndexedMap<T> {
    type Target = BTreeMap<u32, T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for IndexedMap<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> FromIterator<(u32, T)> for IndexedMap<T> {
    fn from_iter<I: IntoIterator<Item = (u32, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Document> FieldCodec for IndexedMap<T> {
    const KIND: FieldKind = FieldKind::IndexedMap;

    fn to_token(&self) -> Token {
        Token::Object(
            self.0
                .iter()
                .map(|(index, doc)| (index.to_string(), document_token(doc)))
                .collect(),
        )
    }

    fn coerce(value: &NodeValue, field: &str) -> Coercion<Self> {
        let Some(items) = list_items(value) else {
            return Coercion::Skip("expected a list".to_string());
        };

        let mut out = BTreeMap::new();
        for (index, item) in items {
            match decode::<T>(item) {
                Ok(Some(doc)) => {
                    out.insert(index, doc);
                }
                Ok(None) => debug!(field, index, "omitting element that is not a mapping"),
                Err(err) => debug!(field, index, error = %err, "omitting undecodable element"),
            }
        }

        if out.is_empty() {
            Coercion::Clear
        } else {
            Coercion::Set(Self(out))
        }
    }

    fn empty() -> Option<Self> {
        Some(Self::default())
    }
}

/// A set of foreign-key references, stored as `{ key: true, ... }`.
///
/// Decoding keeps only the keys: every present key maps to `true`. A value
/// that is not a mapping, or an empty mapping, reads as null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceMap(pub BTreeMap<String, bool>);

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as referenced.
    pub fn insert(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), true);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<K> for PresenceMap {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().map(|k| (k.into(), true)).collect())
    }
}

impl FieldCodec for PresenceMap {
    const KIND: FieldKind = FieldKind::PresenceMap;

    fn to_token(&self) -> Token {
        Token::Object(
            self.0
                .iter()
                .map(|(key, present)| (key.clone(), Token::Bool(*present)))
                .collect(),
        )
    }

    fn coerce(value: &NodeValue, _field: &str) -> Coercion<Self> {
        match value.as_object() {
            Some(map) if !map.is_empty() => {
                Coercion::Set(Self(map.keys().map(|k| (k.clone(), true)).collect()))
            }
            _ => Coercion::Clear,
        }
    }

    fn empty() -> Option<Self> {
        Some(Self::default())
    }
}
