use crate::{CodecResult, Coercion, Document, FieldCodec, NodeValue};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// Decodes a node value into a document.
///
/// Only a mapping decodes; any other shape yields `Ok(None)` (absent node or
/// unexpected shape). Keys resolve to fields by exact name and unknown keys
/// are ignored. Unparsable properties keep their default. The only error is
/// a record-level rejection such as an unknown enum variant.
pub fn decode<T: Document>(value: &NodeValue) -> CodecResult<Option<T>> {
    let Some(map) = value.as_object() else {
        return Ok(None);
    };

    let mut doc = T::default();
    for (key, entry) in map {
        match T::field(key) {
            Some(field) => field.assign(&mut doc, entry)?,
            None => trace!(field = %key, "ignoring unmapped key"),
        }
    }
    Ok(Some(doc))
}

/// Decodes the value of the child stored under `key`.
///
/// A document that carries no id of its own takes the key.
pub fn decode_keyed<T: Document>(key: &str, value: &NodeValue) -> CodecResult<Option<T>> {
    let decoded = decode::<T>(value)?;
    Ok(decoded.map(|mut doc| {
        if !doc.is_persisted() {
            doc.set_id(key.to_string());
        }
        doc
    }))
}

/// Decodes every child of a collection node, keyed by child key.
///
/// A child that is not a mapping or fails to decode is dropped; the rest of
/// the batch is unaffected. A node that is not a mapping yields nothing.
pub fn decode_list<T: Document>(value: &NodeValue) -> BTreeMap<String, T> {
    let mut out = BTreeMap::new();
    let Some(children) = value.as_object() else {
        return out;
    };

    for (key, child) in children {
        match decode_keyed::<T>(key, child) {
            Ok(Some(doc)) => {
                out.insert(key.clone(), doc);
            }
            Ok(None) => warn!(child = %key, "dropping child that is not a mapping"),
            Err(e) => warn!(child = %key, error = %e, "dropping undecodable child"),
        }
    }
    out
}

/// Coerces `value` into `slot`. Used by [`field!`](crate::field) entries.
///
/// Null leaves the slot untouched, as does any coercion that cannot parse
/// the value (logged at debug level).
pub fn assign<F: FieldCodec>(slot: &mut F, value: &NodeValue, field: &str) -> CodecResult<()> {
    if value.is_null() {
        return Ok(());
    }

    match F::coerce(value, field) {
        Coercion::Set(decoded) => *slot = decoded,
        Coercion::Clear => {
            if let Some(empty) = F::empty() {
                *slot = empty;
            }
        }
        Coercion::Skip(reason) => debug!(field, %reason, "skipping field"),
        Coercion::Reject(err) => return Err(err),
    }
    Ok(())
}
