//! Resolving callable parameters from the broker.
//!
//! Each parameter type says what it needs from the broker as a [`Demand`]
//! and how to turn the resolved entry back into itself:
//!
//! | parameter            | resolves to                                              |
//! |----------------------|----------------------------------------------------------|
//! | `T: Resource`        | the stored `T`, or one built by the fallback constructor |
//! | [`Shared<T>`]        | the stored `T`; a failure if none was produced           |
//! | [`Request`]          | the request read handle                                  |
//! | [`ResponseWriter`]   | the response write handle                                |
//! | [`Response`]         | the current response value, possibly empty               |
//! | [`Latest<dyn C>`]    | the most recent value with capability `C`, possibly empty |

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::descriptor::TypeDescriptor;
use crate::error::Unresolved;
use crate::resource::{zero, Resource, Target};
use crate::response::Failure;
use crate::transport::{Request, ResponseWriter};
use crate::value::{Entry, Value};

/// What a parameter needs from the broker.
#[derive(Clone, Copy)]
pub struct Demand {
    /// The requested type.
    pub descriptor: TypeDescriptor,
    /// Allocates a zero value when the broker may construct the type.
    pub zero: Option<fn() -> Box<dyn Target>>,
}

impl Demand {
    /// A demand that can only be satisfied from stored values.
    pub fn lookup(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            zero: None,
        }
    }

    /// A demand the fallback constructor may satisfy.
    pub fn construct<T: Resource>() -> Self {
        Self {
            descriptor: TypeDescriptor::of::<T>(),
            zero: Some(zero::<T>),
        }
    }
}

impl fmt::Debug for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Demand")
            .field("descriptor", &self.descriptor)
            .field("constructible", &self.zero.is_some())
            .finish()
    }
}

/// A callable parameter resolved from the broker.
pub trait Param: Sized {
    /// Describes what to resolve.
    fn demand() -> Demand;

    /// Builds the parameter from the resolved entry.
    ///
    /// On error the returned entry is a failure value.
    fn from_resolved(resolved: Option<Entry>) -> Result<Self, Entry>;
}

fn unresolved<T: ?Sized>() -> Entry {
    Entry::new(Unresolved::new(std::any::type_name::<T>()))
}

fn exact<T: Value>(resolved: Option<Entry>) -> Result<Arc<T>, Entry> {
    resolved
        .and_then(|entry| entry.downcast::<T>())
        .ok_or_else(unresolved::<T>)
}

impl<T: Resource> Param for T {
    fn demand() -> Demand {
        Demand::construct::<T>()
    }

    fn from_resolved(resolved: Option<Entry>) -> Result<Self, Entry> {
        exact::<T>(resolved).map(|value| T::clone(&value))
    }
}

/// A stored value that is never constructed, only looked up.
///
/// Use it for values produced by earlier stages that cannot be built from a
/// request, or that are expensive to clone.
pub struct Shared<T>(pub Arc<T>);

impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shared").field(&std::any::type_name::<T>()).finish()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Value> Param for Shared<T> {
    fn demand() -> Demand {
        Demand::lookup(TypeDescriptor::of::<T>())
    }

    fn from_resolved(resolved: Option<Entry>) -> Result<Self, Entry> {
        exact::<T>(resolved).map(Shared)
    }
}

impl Param for Request {
    fn demand() -> Demand {
        Demand::lookup(TypeDescriptor::of::<Request>())
    }

    fn from_resolved(resolved: Option<Entry>) -> Result<Self, Entry> {
        exact::<Request>(resolved).map(|request| Request::clone(&request))
    }
}

impl Param for ResponseWriter {
    fn demand() -> Demand {
        Demand::lookup(TypeDescriptor::of::<ResponseWriter>())
    }

    fn from_resolved(resolved: Option<Entry>) -> Result<Self, Entry> {
        exact::<ResponseWriter>(resolved).map(|writer| ResponseWriter::clone(&writer))
    }
}

/// The current response value: the open capability.
///
/// Empty when the main handler did not run or only produced a failure.
#[derive(Debug, Clone, Default)]
pub struct Response(Option<Entry>);

impl Response {
    /// Returns true if there is no response value.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the response entry.
    pub fn entry(&self) -> Option<&Entry> {
        self.0.as_ref()
    }

    /// Returns the response value if it is exactly a `T`.
    pub fn downcast<T: Value>(&self) -> Option<Arc<T>> {
        self.0.as_ref().and_then(Entry::downcast)
    }

    /// Views the response value as the capability `C`.
    pub fn view<C: ?Sized + 'static>(&self) -> Option<Arc<C>> {
        self.0.as_ref().and_then(Entry::view)
    }
}

impl Param for Response {
    fn demand() -> Demand {
        Demand::lookup(TypeDescriptor::open())
    }

    fn from_resolved(resolved: Option<Entry>) -> Result<Self, Entry> {
        Ok(Self(resolved))
    }
}

/// The most recently provided value satisfying the capability `C`.
///
/// # Example
///
/// ```rust
/// use hermes_core::{Failure, Latest};
///
/// fn log_failure(failure: Latest<dyn Failure>) {
///     if let Some(err) = failure.get() {
///         eprintln!("request failed: {err}");
///     }
/// }
/// # let _ = log_failure;
/// ```
pub struct Latest<C: ?Sized + 'static> {
    entry: Option<Entry>,
    value: Option<Arc<C>>,
}

/// The most recent failure of the request.
pub type LastFailure = Latest<dyn Failure>;

impl<C: ?Sized + 'static> Latest<C> {
    /// Returns the value, if any.
    pub fn get(&self) -> Option<&Arc<C>> {
        self.value.as_ref()
    }

    /// Returns true if a value was found.
    pub fn is_some(&self) -> bool {
        self.value.is_some()
    }

    /// Returns the entry holding the value.
    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    /// Views the same value as another capability.
    pub fn view<D: ?Sized + 'static>(&self) -> Option<Arc<D>> {
        self.entry.as_ref().and_then(Entry::view)
    }

    /// Converts into the value.
    pub fn into_inner(self) -> Option<Arc<C>> {
        self.value
    }
}

impl<C: ?Sized + 'static> Clone for Latest<C> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            value: self.value.clone(),
        }
    }
}

impl<C: ?Sized + 'static> fmt::Debug for Latest<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latest")
            .field("capability", &std::any::type_name::<C>())
            .field("entry", &self.entry)
            .finish()
    }
}

impl<C: ?Sized + Send + Sync + 'static> Param for Latest<C> {
    fn demand() -> Demand {
        Demand::lookup(TypeDescriptor::capability::<C>())
    }

    fn from_resolved(resolved: Option<Entry>) -> Result<Self, Entry> {
        let value = resolved.as_ref().and_then(Entry::view::<C>);
        Ok(Self {
            entry: resolved,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{HttpError, StructuredResponse};
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    struct Params {
        id: u32,
    }

    crate::value!(Params);
    impl Resource for Params {}

    struct Database;
    crate::value!(Database);

    #[test]
    fn test_resource_demand_is_constructible() {
        let demand = <Params as Param>::demand();
        assert!(demand.zero.is_some());
        assert_eq!(demand.descriptor, TypeDescriptor::of::<Params>());
    }

    #[test]
    fn test_resource_from_entry() {
        let params = Params::from_resolved(Some(Entry::new(Params { id: 4 }))).unwrap();
        assert_eq!(params, Params { id: 4 });
    }

    #[test]
    fn test_shared_debug_needs_no_debug_value() {
        let shared = Shared(Arc::new(Database));
        assert!(format!("{shared:?}").contains("Database"));
    }

    #[test]
    fn test_shared_missing_is_unresolved_failure() {
        assert!(<Shared<Database> as Param>::demand().zero.is_none());
        let failure = Shared::<Database>::from_resolved(None).unwrap_err();
        assert!(failure.descriptor().is_failure());
        assert!(failure.downcast::<Unresolved>().is_some());
    }

    #[test]
    fn test_response_is_open() {
        assert!(<Response as Param>::demand().descriptor.is_open());
        let response = Response::from_resolved(None).unwrap();
        assert!(response.is_empty());
    }

    #[test]
    fn test_latest_views_other_capabilities() {
        let entry = Entry::new(HttpError::unauthorized("Unauthorized."));
        let latest = LastFailure::from_resolved(Some(entry)).unwrap();
        assert_eq!(
            latest.get().map(ToString::to_string).as_deref(),
            Some("http error: 401: Unauthorized.")
        );
        assert!(latest.view::<dyn StructuredResponse>().is_some());
    }

    #[test]
    fn test_latest_empty() {
        let latest = Latest::<dyn StructuredResponse>::from_resolved(None).unwrap();
        assert!(!latest.is_some());
        assert!(latest.into_inner().is_none());
    }
}
