//! Values, capability tables and broker entries.
//!
//! Anything that flows through a pipeline is a [`Value`]. A value declares,
//! explicitly, which capabilities it satisfies by registering casts into a
//! [`Capabilities`] table. The broker uses that table to answer queries like
//! "the most recent failure" without any runtime reflection.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::{Capabilities, Entry, Failure, Value};
//!
//! #[derive(Debug)]
//! struct Denied;
//!
//! impl std::fmt::Display for Denied {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("denied")
//!     }
//! }
//!
//! impl std::error::Error for Denied {}
//!
//! impl Value for Denied {
//!     fn capabilities(caps: &mut Capabilities<Self>) {
//!         caps.failure();
//!     }
//! }
//!
//! let entry = Entry::new(Denied);
//! assert!(entry.descriptor().is_failure());
//! assert_eq!(entry.view::<dyn Failure>().map(|f| f.to_string()), Some("denied".into()));
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::descriptor::TypeDescriptor;
use crate::response::{Encode, Failure, StructuredResponse};

/// A type that can be stored in a request broker.
///
/// Implement [`Value::capabilities`] to advertise the capabilities the type
/// satisfies. The [`value!`](crate::value) macro covers the common cases.
pub trait Value: Sized + Send + Sync + 'static {
    /// Registers the capabilities this type satisfies.
    fn capabilities(caps: &mut Capabilities<Self>) {
        let _ = caps;
    }
}

/// A type-erased view of a stored value as one of its capabilities.
///
/// The boxed value is always an `Arc<C>` for the capability `C` named by `id`.
struct View {
    id: TypeId,
    value: Box<dyn Any + Send + Sync>,
}

struct Cast<T> {
    id: TypeId,
    name: &'static str,
    apply: Box<dyn Fn(Arc<T>) -> View + Send + Sync>,
}

/// The capability table of a value type.
///
/// Each registered capability is a cast from `Arc<T>` to `Arc<C>` where `C`
/// is a trait object type such as `dyn Failure`.
pub struct Capabilities<T> {
    casts: Vec<Cast<T>>,
}

impl<T: Value> Capabilities<T> {
    pub(crate) fn collect() -> Self {
        let mut caps = Self { casts: Vec::new() };
        T::capabilities(&mut caps);
        caps
    }

    /// Registers the capability `C` with the cast used to view `T` as `C`.
    ///
    /// Registering the same capability twice keeps the first cast.
    pub fn add<C>(&mut self, cast: fn(Arc<T>) -> Arc<C>) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let id = TypeId::of::<C>();
        if !self.casts.iter().any(|existing| existing.id == id) {
            self.casts.push(Cast {
                id,
                name: type_name::<C>(),
                apply: Box::new(move |value| View {
                    id,
                    value: Box::new(cast(value)),
                }),
            });
        }
        self
    }

    /// Marks `T` as failure-kind.
    pub fn failure(&mut self) -> &mut Self
    where
        T: Failure,
    {
        self.add::<dyn Failure>(|value| value as Arc<dyn Failure>)
    }

    /// Marks `T` as a structured response.
    pub fn structured(&mut self) -> &mut Self
    where
        T: StructuredResponse,
    {
        self.add::<dyn StructuredResponse>(|value| value as Arc<dyn StructuredResponse>)
    }

    /// Marks `T` as encodable with the default JSON encoding.
    pub fn json(&mut self) -> &mut Self
    where
        T: Serialize,
    {
        self.add::<dyn Encode>(|value| value as Arc<dyn Encode>)
    }

    /// Returns true if the capability identified by `id` is registered.
    pub(crate) fn contains(&self, id: TypeId) -> bool {
        self.casts.iter().any(|cast| cast.id == id)
    }

    /// Returns the names of all registered capabilities.
    pub fn names(&self) -> Vec<&'static str> {
        self.casts.iter().map(|cast| cast.name).collect()
    }

    fn views(&self, value: &Arc<T>) -> Vec<View> {
        self.casts
            .iter()
            .map(|cast| (cast.apply)(Arc::clone(value)))
            .collect()
    }
}

/// A value stored in a broker.
///
/// An entry pairs the value's [`TypeDescriptor`] with the raw value and its
/// capability views. Cloning an entry is cheap and shares the value.
#[derive(Clone)]
pub struct Entry {
    inner: Arc<EntryInner>,
}

struct EntryInner {
    descriptor: TypeDescriptor,
    raw: Arc<dyn Any + Send + Sync>,
    views: Vec<View>,
}

impl Entry {
    /// Wraps a value into an entry.
    pub fn new<T: Value>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value into an entry.
    pub fn from_arc<T: Value>(value: Arc<T>) -> Self {
        let views = Capabilities::<T>::collect().views(&value);
        Self {
            inner: Arc::new(EntryInner {
                descriptor: TypeDescriptor::of::<T>(),
                raw: value,
                views,
            }),
        }
    }

    /// Returns the descriptor of the stored concrete type.
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.inner.descriptor
    }

    /// Returns the type name of the stored value.
    pub fn type_name(&self) -> &'static str {
        self.inner.descriptor.name()
    }

    /// Returns the stored value if it is exactly a `T`.
    pub fn downcast<T: Value>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner.raw).downcast::<T>().ok()
    }

    /// Returns the raw stored value.
    pub fn raw(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.inner.raw
    }

    /// Views the stored value as the capability `C`, if it was registered.
    pub fn view<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        let id = TypeId::of::<C>();
        self.inner
            .views
            .iter()
            .find(|view| view.id == id)
            .and_then(|view| view.value.downcast_ref::<Arc<C>>())
            .cloned()
    }

    /// Returns true if the stored value satisfies `capability`.
    pub fn satisfies(&self, capability: &TypeDescriptor) -> bool {
        self.inner.descriptor.satisfies(capability)
    }

    /// Views the stored value as a failure.
    pub fn failure(&self) -> Option<Arc<dyn Failure>> {
        self.view::<dyn Failure>()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("type", &self.type_name())
            .field("views", &self.inner.views.len())
            .finish()
    }
}

/// Implements [`Value`] for a type, optionally registering capabilities.
///
/// The capability names are the registration methods of
/// [`Capabilities`]: `failure`, `structured` and `json`.
///
/// ```rust
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Pet {
///     name: String,
/// }
///
/// struct Meta;
///
/// hermes_core::value!(Pet => json);
/// hermes_core::value!(Meta);
/// ```
#[macro_export]
macro_rules! value {
    ($ty:ty) => {
        impl $crate::Value for $ty {}
    };
    ($ty:ty => $($cap:ident),+ $(,)?) => {
        impl $crate::Value for $ty {
            fn capabilities(caps: &mut $crate::Capabilities<Self>) {
                $(caps.$cap();)+
            }
        }
    };
}

value!(String => json);
value!(&'static str => json);
value!(serde_json::Value => json);

impl<T> Value for Vec<T>
where
    T: Serialize + Send + Sync + 'static,
{
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.json();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Plain(u32);

    impl Value for Plain {}

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    impl Value for Boom {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.failure().failure();
        }
    }

    #[test]
    fn test_entry_downcast() {
        let entry = Entry::new(Plain(7));
        assert_eq!(entry.downcast::<Plain>().as_deref(), Some(&Plain(7)));
        assert!(entry.downcast::<Boom>().is_none());
    }

    #[test]
    fn test_plain_value_has_no_views() {
        let entry = Entry::new(Plain(1));
        assert!(entry.failure().is_none());
        assert!(entry.view::<dyn Encode>().is_none());
        assert!(!entry.descriptor().is_failure());
    }

    #[test]
    fn test_failure_view_shares_value() {
        let entry = Entry::new(Boom);
        let failure = entry.failure().expect("failure view");
        assert_eq!(failure.to_string(), "boom");
        assert!(entry.descriptor().is_failure());
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let caps = Capabilities::<Boom>::collect();
        assert_eq!(caps.names().len(), 1);
    }

    #[test]
    fn test_vec_is_json_encodable() {
        let entry = Entry::new(vec![1, 2, 3]);
        let encode = entry.view::<dyn Encode>().expect("json view");
        let mut out = Vec::new();
        encode.encode(&mut out).expect("encode");
        assert_eq!(out, b"[1,2,3]");
    }

    #[test]
    fn test_debug_names_type() {
        let entry = Entry::new(Plain(3));
        assert!(format!("{entry:?}").contains("Plain"));
    }
}
