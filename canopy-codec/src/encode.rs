use crate::{CodecError, CodecResult, Document, NodeMap, NodeValue, Token};
use canopy_types::format_timestamp;
use serde_json::Number;

/// Encodes a document into the mapping written to its node.
///
/// Fields whose value is null are left out. Any field the store cannot
/// represent fails the whole call, so a mapping is either complete or absent.
pub fn encode<T: Document>(doc: &T) -> CodecResult<NodeMap> {
    let mut map = NodeMap::new();
    for field in T::FIELDS {
        if let Some(value) = encode_token(field.token(doc), field.name)? {
            map.insert(field.name.to_string(), value);
        }
    }
    Ok(map)
}

/// Encodes one token. `Ok(None)` means "absent" (the token was null).
///
/// `path` locates the token inside its document for error messages.
pub fn encode_token(token: Token, path: &str) -> CodecResult<Option<NodeValue>> {
    let value = match token {
        Token::Null => return Ok(None),

        Token::Object(entries) => {
            let mut map = NodeMap::new();
            for (key, entry) in entries {
                let entry_path = format!("{path}.{key}");
                if let Some(value) = encode_token(entry, &entry_path)? {
                    map.insert(key, value);
                }
            }
            NodeValue::Object(map)
        }

        // No null elision inside lists: positions must survive.
        Token::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let item_path = format!("{path}[{index}]");
                list.push(encode_token(item, &item_path)?.unwrap_or(NodeValue::Null));
            }
            NodeValue::Array(list)
        }

        Token::Integer(i) => NodeValue::Number(i.into()),
        Token::Float(f) => NodeValue::Number(Number::from_f64(f).ok_or_else(|| {
            CodecError::NonFiniteFloat {
                field: path.to_string(),
            }
        })?),

        Token::Date(ts) => NodeValue::String(format_timestamp(&ts)),

        Token::String(s) => NodeValue::String(s),
        Token::Bool(b) => NodeValue::String(b.to_string()),
        Token::Guid(g) => NodeValue::String(g.to_string()),
        Token::Uri(u) => NodeValue::String(u.to_string()),

        unsupported @ (Token::Bytes(_) | Token::TimeSpan(_) | Token::Raw(_)) => {
            return Err(CodecError::Unsupported {
                field: path.to_string(),
                kind: unsupported.kind_name(),
            });
        }
    };
    Ok(Some(value))
}
