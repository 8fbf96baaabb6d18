//! Per-type encode and coercion rules.
//!
//! Decoding coerces through a value's textual form: a string field accepts
//! anything, a numeric or boolean field parses the text and keeps its default
//! when parsing fails. Only an unknown enum variant rejects the record.

use crate::{CodecError, FieldKind, NodeValue, Token};
use canopy_types::parse_timestamp;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Outcome of coercing one native value into a field type.
#[derive(Debug)]
pub enum Coercion<T> {
    /// Assign the value.
    Set(T),
    /// Assign the type's null (see [`FieldCodec::empty`]).
    Clear,
    /// Leave the field as it is; the reason is logged.
    Skip(String),
    /// The whole record cannot be decoded.
    Reject(CodecError),
}

impl<T> Coercion<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Coercion<U> {
        match self {
            Self::Set(value) => Coercion::Set(f(value)),
            Self::Clear => Coercion::Clear,
            Self::Skip(reason) => Coercion::Skip(reason),
            Self::Reject(err) => Coercion::Reject(err),
        }
    }
}

/// A Rust type that can sit in a document field.
pub trait FieldCodec: Sized {
    const KIND: FieldKind;

    fn to_token(&self) -> Token;

    /// Coerces a non-null native value. `field` names the field for errors.
    fn coerce(value: &NodeValue, field: &str) -> Coercion<Self>;

    /// The value [`Coercion::Clear`] assigns; `None` leaves the field as is.
    fn empty() -> Option<Self> {
        None
    }
}

/// The textual form of a native value; `None` for null.
///
/// Strings are returned verbatim, numbers and booleans as their JSON text,
/// objects and arrays as compact JSON.
pub fn text_form(value: &NodeValue) -> Option<String> {
    match value {
        NodeValue::Null => None,
        NodeValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_text<T: FromStr>(value: &NodeValue, type_name: &str) -> Coercion<T> {
    let Some(text) = text_form(value) else {
        return Coercion::Skip("null value".to_string());
    };
    match text.trim().parse::<T>() {
        Ok(parsed) => Coercion::Set(parsed),
        Err(_) => Coercion::Skip(format!("{text:?} is not a valid {type_name}")),
    }
}

/// Coerces an enum field by variant name.
///
/// Used by [`named_enum!`](crate::named_enum); an unknown name rejects the record.
pub fn coerce_enum<T>(
    value: &NodeValue,
    field: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Coercion<T> {
    let Some(text) = text_form(value) else {
        return Coercion::Skip("null value".to_string());
    };
    match parse(text.trim()) {
        Some(variant) => Coercion::Set(variant),
        None => Coercion::Reject(CodecError::UnknownVariant {
            field: field.to_string(),
            value: text,
        }),
    }
}

impl FieldCodec for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_token(&self) -> Token {
        Token::String(self.clone())
    }

    fn coerce(value: &NodeValue, _field: &str) -> Coercion<Self> {
        match text_form(value) {
            Some(text) => Coercion::Set(text),
            None => Coercion::Skip("null value".to_string()),
        }
    }
}

macro_rules! integer_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl FieldCodec for $ty {
            const KIND: FieldKind = FieldKind::Integer;

            fn to_token(&self) -> Token {
                Token::Integer(i64::from(*self))
            }

            fn coerce(value: &NodeValue, _field: &str) -> Coercion<Self> {
                parse_text(value, stringify!($ty))
            }
        }
    )*};
}

integer_codec!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! float_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl FieldCodec for $ty {
            const KIND: FieldKind = FieldKind::Float;

            fn to_token(&self) -> Token {
                Token::Float(f64::from(*self))
            }

            fn coerce(value: &NodeValue, _field: &str) -> Coercion<Self> {
                parse_text(value, stringify!($ty))
            }
        }
    )*};
}

float_codec!(f32, f64);

impl FieldCodec for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_token(&self) -> Token {
        Token::Bool(*self)
    }

    fn coerce(value: &NodeValue, _field: &str) -> Coercion<Self> {
        let Some(text) = text_form(value) else {
            return Coercion::Skip("null value".to_string());
        };
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Coercion::Set(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Coercion::Set(false)
        } else {
            Coercion::Skip(format!("{text:?} is not a valid bool"))
        }
    }
}

impl FieldCodec for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::Timestamp;

    fn to_token(&self) -> Token {
        Token::Date(*self)
    }

    fn coerce(value: &NodeValue, _field: &str) -> Coercion<Self> {
        let Some(text) = text_form(value) else {
            return Coercion::Skip("null value".to_string());
        };
        match parse_timestamp(&text) {
            Ok(ts) => Coercion::Set(ts),
            Err(e) => Coercion::Skip(e.to_string()),
        }
    }
}

impl FieldCodec for Uuid {
    const KIND: FieldKind = FieldKind::Guid;

    fn to_token(&self) -> Token {
        Token::Guid(*self)
    }

    fn coerce(value: &NodeValue, _field: &str) -> Coercion<Self> {
        parse_text(value, "guid")
    }
}

impl FieldCodec for Url {
    const KIND: FieldKind = FieldKind::Uri;

    fn to_token(&self) -> Token {
        Token::Uri(self.clone())
    }

    fn coerce(value: &NodeValue, _field: &str) -> Coercion<Self> {
        parse_text(value, "uri")
    }
}

impl FieldCodec for Duration {
    const KIND: FieldKind = FieldKind::Unsupported;

    fn to_token(&self) -> Token {
        Token::TimeSpan(*self)
    }

    fn coerce(_value: &NodeValue, _field: &str) -> Coercion<Self> {
        Coercion::Skip("unsupported field kind: timespan".to_string())
    }
}

impl<T: FieldCodec> FieldCodec for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_token(&self) -> Token {
        match self {
            Some(value) => value.to_token(),
            None => Token::Null,
        }
    }

    fn coerce(value: &NodeValue, field: &str) -> Coercion<Self> {
        match T::coerce(value, field) {
            Coercion::Set(inner) => Coercion::Set(Some(inner)),
            Coercion::Clear => Coercion::Set(None),
            Coercion::Skip(reason) => Coercion::Skip(reason),
            Coercion::Reject(err) => Coercion::Reject(err),
        }
    }

    fn empty() -> Option<Self> {
        Some(None)
    }
}

/// Implements [`FieldCodec`] for a fieldless enum, stored by variant name.
///
/// ```
/// use canopy_codec::{FieldCodec, Token, named_enum};
///
/// #[derive(Debug, Default, PartialEq)]
/// enum Priority {
///     #[default]
///     Low,
///     High,
/// }
///
/// named_enum!(Priority { Low, High });
///
/// assert_eq!(Priority::High.to_token(), Token::String("High".into()));
/// ```
#[macro_export]
macro_rules! named_enum {
    ($ty:ty { $($variant:ident),+ $(,)? }) => {
        impl $crate::FieldCodec for $ty {
            const KIND: $crate::FieldKind = $crate::FieldKind::Enum;

            fn to_token(&self) -> $crate::Token {
                let name = match self {
                    $(Self::$variant => stringify!($variant),)+
                };
                $crate::Token::String(name.to_string())
            }

            fn coerce(value: &$crate::NodeValue, field: &str) -> $crate::Coercion<Self> {
                $crate::coerce_enum(value, field, |name| match name {
                    $(stringify!($variant) => Some(Self::$variant),)+
                    _ => None,
                })
            }
        }
    };
}
