//! Constructible values and the fallback constructor contract.
//!
//! A [`Resource`] is a value the broker may build on demand when no earlier
//! stage produced one. The broker allocates `T::default()` and hands it, as a
//! [`Target`], to the pipeline's [`Constructor`] together with the transport
//! handles. The constructor gathers a [`Document`] from the request and asks
//! the target to populate itself from it.
//!
//! Which request parts feed which fields is declared with [`Binding`]s:
//!
//! ```rust
//! use hermes_core::{Binding, Resource};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Clone, Default, Deserialize)]
//! #[serde(default)]
//! struct Credentials {
//!     key: String,
//! }
//!
//! hermes_core::value!(Credentials);
//!
//! impl Resource for Credentials {
//!     fn bindings() -> &'static [Binding] {
//!         const BINDINGS: &[Binding] = &[Binding::header("key", "X-PETSTORE-KEY")];
//!         BINDINGS
//!     }
//! }
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::descriptor::TypeDescriptor;
use crate::document::Document;
use crate::error::ConstructError;
use crate::transport::{Request, ResponseWriter};
use crate::value::{Entry, Value};

/// Where a bound field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// A request header.
    Header,
    /// A query string parameter.
    Query,
    /// A path segment captured by the dispatcher.
    Segment,
    /// A cookie.
    Cookie,
}

/// Binds a field of a [`Resource`] to a part of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    /// Field name, as seen by the type's `Deserialize` implementation.
    pub field: &'static str,
    /// Request part the value comes from.
    pub source: Source,
    /// Name of the header, query parameter, segment or cookie.
    pub key: &'static str,
    /// Whether every value of the key is collected into a sequence.
    pub repeated: bool,
}

impl Binding {
    const fn new(field: &'static str, source: Source, key: &'static str) -> Self {
        Self {
            field,
            source,
            key,
            repeated: false,
        }
    }

    /// Binds `field` to the header `key`.
    pub const fn header(field: &'static str, key: &'static str) -> Self {
        Self::new(field, Source::Header, key)
    }

    /// Binds `field` to the query parameter `key`.
    pub const fn query(field: &'static str, key: &'static str) -> Self {
        Self::new(field, Source::Query, key)
    }

    /// Binds `field` to every value of the query parameter `key`.
    pub const fn query_all(field: &'static str, key: &'static str) -> Self {
        Self {
            repeated: true,
            ..Self::new(field, Source::Query, key)
        }
    }

    /// Binds `field` to the path segment `key`.
    pub const fn segment(field: &'static str, key: &'static str) -> Self {
        Self::new(field, Source::Segment, key)
    }

    /// Binds `field` to the cookie `key`.
    pub const fn cookie(field: &'static str, key: &'static str) -> Self {
        Self::new(field, Source::Cookie, key)
    }
}

/// A value the broker can construct from the request when nothing produced
/// it earlier.
///
/// Fields not present in the request keep their [`Default`] value when the
/// type is annotated with `#[serde(default)]`.
pub trait Resource: Value + Clone + Default + DeserializeOwned {
    /// Declares which fields are read from headers, query parameters, path
    /// segments and cookies. Everything else comes from the body.
    fn bindings() -> &'static [Binding] {
        &[]
    }
}

/// A freshly allocated zero value handed to a [`Constructor`].
pub trait Target: Send {
    /// Returns the descriptor of the type being constructed.
    fn descriptor(&self) -> TypeDescriptor;

    /// Returns the field bindings of the type being constructed.
    fn bindings(&self) -> &'static [Binding];

    /// Populates the value from a document.
    ///
    /// An empty document leaves the value untouched.
    fn populate(&mut self, document: Document) -> Result<(), serde_json::Error>;

    /// Converts the populated value into a broker entry.
    fn into_entry(self: Box<Self>) -> Entry;
}

impl<T: Resource> Target for T {
    fn descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }

    fn bindings(&self) -> &'static [Binding] {
        T::bindings()
    }

    fn populate(&mut self, document: Document) -> Result<(), serde_json::Error> {
        if !document.is_empty() {
            *self = document.decode()?;
        }
        Ok(())
    }

    fn into_entry(self: Box<Self>) -> Entry {
        Entry::new(*self)
    }
}

/// Allocates the zero value of `T` as a construction target.
pub(crate) fn zero<T: Resource>() -> Box<dyn Target> {
    Box::new(T::default())
}

/// The fallback constructor: populates a target from the transport handles.
pub type Constructor =
    Arc<dyn Fn(&ResponseWriter, &Request, &mut dyn Target) -> Result<(), ConstructError> + Send + Sync>;

/// Wraps a function as a [`Constructor`].
pub fn constructor<F>(construct: F) -> Constructor
where
    F: Fn(&ResponseWriter, &Request, &mut dyn Target) -> Result<(), ConstructError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(construct)
}

fn leave_zero(
    _writer: &ResponseWriter,
    _request: &Request,
    _target: &mut dyn Target,
) -> Result<(), ConstructError> {
    Ok(())
}

/// A constructor that leaves every target at its zero value.
pub fn zero_constructor() -> Constructor {
    Arc::new(leave_zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Part;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct Query {
        limit: u32,
        name: String,
    }

    crate::value!(Query);

    impl Resource for Query {
        fn bindings() -> &'static [Binding] {
            const BINDINGS: &[Binding] = &[Binding::query("limit", "limit")];
            BINDINGS
        }
    }

    #[test]
    fn test_binding_constructors() {
        let binding = Binding::query_all("categories", "categories");
        assert_eq!(binding.source, Source::Query);
        assert!(binding.repeated);
        assert!(!Binding::cookie("session", "sid").repeated);
    }

    #[test]
    fn test_target_populates_from_document() {
        let mut target = zero::<Query>();
        assert_eq!(target.bindings().len(), 1);
        assert_eq!(target.descriptor(), TypeDescriptor::of::<Query>());

        let mut doc = Document::new();
        doc.insert("limit", Part::text("5"));
        target.populate(doc).unwrap();

        let entry = target.into_entry();
        let query = entry.downcast::<Query>().unwrap();
        assert_eq!(query.limit, 5);
        assert_eq!(query.name, "");
    }

    #[test]
    fn test_empty_document_keeps_zero_value() {
        let mut target = zero::<Query>();
        target.populate(Document::new()).unwrap();
        let entry = target.into_entry();
        assert_eq!(*entry.downcast::<Query>().unwrap(), Query::default());
    }

    #[test]
    fn test_zero_constructor_succeeds() {
        let construct = zero_constructor();
        let mut target = zero::<Query>();
        let request = Request::from_http(http::Request::new(bytes::Bytes::new()));
        assert!(construct(&ResponseWriter::new(), &request, target.as_mut()).is_ok());
    }
}
