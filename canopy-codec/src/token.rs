use chrono::{DateTime, Utc};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// The intermediate form of a property on its way to the store.
///
/// Every field of a [`Document`](crate::Document) is first turned into a
/// token; [`encode_token`](crate::encode_token) then decides how (and
/// whether) the token is written. The last three variants exist so that
/// properties the store cannot hold are reported instead of guessed at.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Null,
    String(String),
    Bool(bool),
    Guid(Uuid),
    Uri(Url),
    Integer(i64),
    Float(f64),
    Date(DateTime<Utc>),
    Object(Vec<(String, Token)>),
    Array(Vec<Token>),
    Bytes(Vec<u8>),
    TimeSpan(Duration),
    Raw(String),
}

impl Token {
    /// Name of the variant, for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Guid(_) => "guid",
            Self::Uri(_) => "uri",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Date(_) => "date",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Bytes(_) => "bytes",
            Self::TimeSpan(_) => "timespan",
            Self::Raw(_) => "raw",
        }
    }
}
