//! The document a fallback constructor decodes into a [`Resource`].
//!
//! A [`Document`] is a set of named fields. Each field is either a JSON value
//! (taken from a decoded body) or one or more raw strings (taken from a
//! header, query parameter, path segment or cookie). Raw strings are coerced
//! into whatever type the target field asks for: numbers and booleans are
//! parsed, structured types are parsed as JSON, and strings are used as-is.
//!
//! [`Resource`]: crate::Resource

use indexmap::IndexMap;
use serde::de::value::{MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{DeserializeOwned, Error as _, IntoDeserializer, Visitor};
use serde::Deserializer;

/// One field of a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// A JSON value.
    Json(serde_json::Value),
    /// Raw strings; `repeated` fields always decode as sequences.
    Text {
        /// The raw values, in request order.
        values: Vec<String>,
        /// Whether the field is declared as repeated.
        repeated: bool,
    },
}

impl Part {
    /// A single raw string.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            values: vec![value.into()],
            repeated: false,
        }
    }

    /// A repeated raw field.
    pub fn repeated(values: Vec<String>) -> Self {
        Self::Text {
            values,
            repeated: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Root {
    Fields(IndexMap<String, Part>),
    Whole(serde_json::Value),
}

/// Named fields gathered from a request, ready to decode.
///
/// # Example
///
/// ```rust
/// use hermes_core::{Document, Part};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Filter {
///     limit: u32,
///     tags: Vec<String>,
/// }
///
/// let mut doc = Document::new();
/// doc.insert("limit", Part::text("25"));
/// doc.insert("tags", Part::repeated(vec!["a".into(), "b".into()]));
///
/// let filter: Filter = doc.decode().unwrap();
/// assert_eq!(filter.limit, 25);
/// assert_eq!(filter.tags, ["a", "b"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Root,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self {
            root: Root::Fields(IndexMap::new()),
        }
    }

    /// Creates a document from a decoded body.
    ///
    /// A JSON object contributes one field per member; any other JSON value
    /// becomes the whole document.
    pub fn from_json(body: serde_json::Value) -> Self {
        match body {
            serde_json::Value::Object(members) => Self {
                root: Root::Fields(
                    members
                        .into_iter()
                        .map(|(name, value)| (name, Part::Json(value)))
                        .collect(),
                ),
            },
            other => Self {
                root: Root::Whole(other),
            },
        }
    }

    /// Sets a field, replacing any earlier value.
    ///
    /// Setting a field on a document built from a non-object body replaces
    /// that body.
    pub fn insert(&mut self, name: impl Into<String>, part: Part) {
        match &mut self.root {
            Root::Fields(fields) => {
                fields.insert(name.into(), part);
            }
            Root::Whole(_) => {
                let mut fields = IndexMap::new();
                fields.insert(name.into(), part);
                self.root = Root::Fields(fields);
            }
        }
    }

    /// Returns a field by name.
    pub fn get(&self, name: &str) -> Option<&Part> {
        match &self.root {
            Root::Fields(fields) => fields.get(name),
            Root::Whole(_) => None,
        }
    }

    /// Returns true if the document has nothing to decode.
    pub fn is_empty(&self) -> bool {
        match &self.root {
            Root::Fields(fields) => fields.is_empty(),
            Root::Whole(_) => false,
        }
    }

    /// Decodes the document into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        match self.root {
            Root::Fields(fields) => T::deserialize(MapDeserializer::new(fields.into_iter())),
            Root::Whole(value) => T::deserialize(value),
        }
    }
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for Part {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

/// Parses a raw string as a JSON string literal, falling back to the string
/// itself.
fn unquote(text: String) -> String {
    match serde_json::from_str::<String>(&text) {
        Ok(inner) => inner,
        Err(_) => text,
    }
}

impl Part {
    fn single(self) -> Result<String, serde_json::Error> {
        match self {
            Self::Text { mut values, .. } if values.len() == 1 => Ok(values.remove(0)),
            Self::Text { values, .. } => Err(serde_json::Error::custom(format!(
                "expected a single value, found {}",
                values.len()
            ))),
            Self::Json(value) => Err(serde_json::Error::custom(format!(
                "expected a raw value, found {value}"
            ))),
        }
    }

    fn is_sequence(&self) -> bool {
        matches!(self, Self::Text { values, repeated } if *repeated || values.len() > 1)
    }

    fn into_sequence(self) -> Vec<Part> {
        match self {
            Self::Text { values, .. } => values.into_iter().map(Part::text).collect(),
            json @ Self::Json(_) => vec![json],
        }
    }
}

macro_rules! parse_text {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self {
                Part::Json(value) => value.$method(visitor),
                text => {
                    let raw = text.single()?;
                    let parsed = raw.trim().parse::<$ty>().map_err(|_| {
                        serde_json::Error::custom(format!(
                            "invalid {} value: {raw:?}",
                            stringify!($ty)
                        ))
                    })?;
                    visitor.$visit(parsed)
                }
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for Part {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Self::Json(value) => value.deserialize_any(visitor),
            text if text.is_sequence() => text.deserialize_seq(visitor),
            text => {
                let raw = text.single()?;
                match serde_json::from_str::<serde_json::Value>(&raw) {
                    Ok(value) => value.deserialize_any(visitor),
                    Err(_) => visitor.visit_string(raw),
                }
            }
        }
    }

    parse_text! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
        deserialize_char => visit_char: char,
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Self::Json(value) => value.deserialize_string(visitor),
            text => visitor.visit_string(unquote(text.single()?)),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Self::Json(value) => value.deserialize_byte_buf(visitor),
            text => visitor.visit_byte_buf(text.single()?.into_bytes()),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Self::Json(value) => value.deserialize_option(visitor),
            text => visitor.visit_some(text),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Self::Json(value) => value.deserialize_unit(visitor),
            _ => visitor.visit_unit(),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Self::Json(value) => value.deserialize_seq(visitor),
            text if text.is_sequence() => {
                SeqDeserializer::new(text.into_sequence().into_iter()).deserialize_any(visitor)
            }
            text => {
                let raw = text.single()?;
                match serde_json::from_str::<serde_json::Value>(&raw) {
                    Ok(array @ serde_json::Value::Array(_)) => array.deserialize_seq(visitor),
                    _ => SeqDeserializer::new(std::iter::once(Part::text(raw)))
                        .deserialize_any(visitor),
                }
            }
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Self::Json(value) => value.deserialize_map(visitor),
            text => serde_json::from_str::<serde_json::Value>(&text.single()?)?
                .deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self {
            Self::Json(value) => value.deserialize_struct(name, fields, visitor),
            text => serde_json::from_str::<serde_json::Value>(&text.single()?)?
                .deserialize_struct(name, fields, visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self {
            Self::Json(value) => value.deserialize_enum(name, variants, visitor),
            text => {
                let raw = text.single()?;
                match serde_json::from_str::<serde_json::Value>(&raw) {
                    Ok(object @ serde_json::Value::Object(_)) => {
                        object.deserialize_enum(name, variants, visitor)
                    }
                    _ => {
                        let variant: StringDeserializer<serde_json::Error> =
                            unquote(raw).into_deserializer();
                        visitor.visit_enum(variant)
                    }
                }
            }
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}
