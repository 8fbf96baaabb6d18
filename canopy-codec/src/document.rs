use crate::{CodecResult, FieldCodec, NodeValue, Token, encode_token, text_form};
use std::fmt;

/// The minimal shape of every mapped entity: a mutable string id.
///
/// An empty id means the entity has not been created in the store yet.
pub trait Identifiable {
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Whether the entity carries a store id.
    fn is_persisted(&self) -> bool {
        !self.id().is_empty()
    }
}

/// A type the codec can map, described by its field table.
///
/// ```
/// use canopy_codec::{Document, Field, Identifiable, field};
///
/// #[derive(Debug, Default)]
/// struct Note {
///     id: String,
///     title: String,
///     pinned: bool,
/// }
///
/// impl Identifiable for Note {
///     fn id(&self) -> &str { &self.id }
///     fn set_id(&mut self, id: String) { self.id = id; }
/// }
///
/// impl Document for Note {
///     const FIELDS: &'static [Field<Self>] = &[
///         field!(Note, id),
///         field!(Note, title),
///         field!(Note, pinned => "isPinned"),
///     ];
/// }
///
/// assert!(Note::field("isPinned").is_some());
/// assert!(Note::field("pinned").is_none());
/// ```
pub trait Document: Identifiable + Default + Send + 'static {
    /// Every stored property, under its stored name.
    const FIELDS: &'static [Field<Self>];

    /// Resolves a stored name to its field entry (exact match).
    fn field(name: &str) -> Option<&'static Field<Self>> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }
}

/// The coercion family a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Bool,
    Timestamp,
    Guid,
    Uri,
    Enum,
    Document,
    List,
    IndexedMap,
    PresenceMap,
    /// Encodes to an error, decodes to a no-op.
    Unsupported,
}

/// One entry of a document's field table.
///
/// Entries hold plain function pointers so tables can live in constants.
/// Use [`field!`](crate::field) rather than calling [`Field::new`] by hand.
pub struct Field<T: 'static> {
    pub name: &'static str,
    encode: fn(&T) -> Token,
    decode: fn(&mut T, &NodeValue) -> CodecResult<()>,
    kind: fn(&T) -> FieldKind,
}

impl<T: 'static> Field<T> {
    pub const fn new(
        name: &'static str,
        encode: fn(&T) -> Token,
        decode: fn(&mut T, &NodeValue) -> CodecResult<()>,
        kind: fn(&T) -> FieldKind,
    ) -> Self {
        Self {
            name,
            encode,
            decode,
            kind,
        }
    }

    /// Tokenizes this field of `doc`.
    pub fn token(&self, doc: &T) -> Token {
        (self.encode)(doc)
    }

    /// Coerces `value` into this field of `doc`.
    pub fn assign(&self, doc: &mut T, value: &NodeValue) -> CodecResult<()> {
        (self.decode)(doc, value)
    }

    /// The field's value in its stored textual form, or `None` if absent.
    ///
    /// This is the form equality filters compare against.
    pub fn text(&self, doc: &T) -> CodecResult<Option<String>> {
        let value = encode_token(self.token(doc), self.name)?;
        Ok(value.as_ref().and_then(text_form))
    }
}

impl<T: Default + 'static> Field<T> {
    pub fn kind(&self) -> FieldKind {
        (self.kind)(&T::default())
    }

    /// The value to compare against when querying this field for `text`.
    ///
    /// Numeric fields are stored as numbers, so a numeric `text` becomes a
    /// number; everything else (booleans included) is stored as a string.
    pub fn query_value(&self, text: &str) -> NodeValue {
        match self.kind() {
            FieldKind::Integer => text
                .trim()
                .parse::<i64>()
                .map(NodeValue::from)
                .unwrap_or_else(|_| NodeValue::from(text)),
            FieldKind::Float => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(NodeValue::Number)
                .unwrap_or_else(|| NodeValue::from(text)),
            _ => NodeValue::from(text),
        }
    }
}

impl<T: 'static> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

/// Reports the coercion family of a field value's type.
pub fn kind_of<F: FieldCodec>(_value: &F) -> FieldKind {
    F::KIND
}

/// Builds a [`Field`] entry for a struct member.
///
/// `field!(Type, member)` stores the member under its own name;
/// `field!(Type, member => "storedName")` renames it.
#[macro_export]
macro_rules! field {
    ($ty:ty, $member:ident) => {
        $crate::field!($ty, $member => stringify!($member))
    };
    ($ty:ty, $member:ident => $name:expr) => {
        $crate::Field::<$ty>::new(
            $name,
            |doc: &$ty| $crate::FieldCodec::to_token(&doc.$member),
            |doc: &mut $ty, value: &$crate::NodeValue| $crate::assign(&mut doc.$member, value, $name),
            |doc: &$ty| $crate::kind_of(&doc.$member),
        )
    };
}
