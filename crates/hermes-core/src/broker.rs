//! The request-scoped value broker.
//!
//! A [`Broker`] holds every value produced so far while handling one request:
//! the two transport handles it is seeded with, values built by the fallback
//! constructor, and the outputs of every stage that has run. Values are keyed
//! by concrete type for exact lookups and also kept in provision order so a
//! capability lookup finds the most recent value satisfying it.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::{Broker, Failure, HttpError, Request, ResponseWriter, TypeDescriptor};
//!
//! let request = Request::from_http(http::Request::new(bytes::Bytes::new()));
//! let mut broker = Broker::new(ResponseWriter::new(), request, hermes_core::zero_constructor());
//!
//! broker.provide_value(HttpError::forbidden("first"));
//! broker.provide_value(HttpError::unauthorized("second"));
//!
//! let latest = broker.latest::<dyn Failure>().unwrap();
//! assert_eq!(latest.to_string(), "http error: 401: second");
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{TypeDescriptor, TypeKind};
use crate::error::Unresolved;
use crate::output::Slot;
use crate::param::Demand;
use crate::resource::Constructor;
use crate::transport::{Request, ResponseWriter};
use crate::value::{Entry, Value};

/// Per-request, type-keyed value store.
pub struct Broker {
    writer: ResponseWriter,
    request: Request,
    constructor: Constructor,
    exact: HashMap<TypeId, Entry>,
    ordered: Vec<Entry>,
    response: Option<Entry>,
    /// Construction failures by the type that could not be built.
    failed: HashMap<TypeId, Entry>,
}

impl Broker {
    /// Creates a broker seeded with the transport handles.
    pub fn new(writer: ResponseWriter, request: Request, constructor: Constructor) -> Self {
        let mut broker = Self {
            writer: writer.clone(),
            request: request.clone(),
            constructor,
            exact: HashMap::new(),
            ordered: Vec::new(),
            response: None,
            failed: HashMap::new(),
        };
        broker.provide_value(writer);
        broker.provide_value(request);
        broker
    }

    /// Stores an output slot.
    ///
    /// Typed absences and true absences are not stored. Returns true if a
    /// value was stored.
    pub fn provide(&mut self, slot: Slot) -> bool {
        match slot {
            Slot::Value(entry) => {
                self.provide_entry(entry);
                true
            }
            Slot::TypedAbsent(descriptor) => {
                tracing::trace!(type_name = descriptor.name(), "skipping typed absent value");
                false
            }
            Slot::Absent => false,
        }
    }

    /// Stores an entry, replacing any earlier entry of the same concrete type
    /// for exact lookups.
    pub fn provide_entry(&mut self, entry: Entry) {
        tracing::trace!(type_name = entry.type_name(), "providing value");
        self.exact.insert(entry.descriptor().id(), entry.clone());
        self.ordered.push(entry);
    }

    /// Stores a value.
    pub fn provide_value<T: Value>(&mut self, value: T) {
        self.provide_entry(Entry::new(value));
    }

    /// Looks up a value without constructing anything.
    ///
    /// The open capability returns the current response; a concrete type
    /// returns its exact entry; a capability returns the most recently
    /// provided entry satisfying it.
    pub fn lookup(&self, descriptor: &TypeDescriptor) -> Option<Entry> {
        match descriptor.kind() {
            TypeKind::Open => self.response.clone(),
            TypeKind::Concrete => self.exact.get(&descriptor.id()).cloned(),
            TypeKind::Capability => self
                .ordered
                .iter()
                .rev()
                .find(|entry| entry.satisfies(descriptor))
                .cloned(),
        }
    }

    /// Resolves a demand, constructing the value if it is missing and
    /// constructible.
    ///
    /// Capabilities and the open capability resolve to `None` when nothing
    /// matches. A missing concrete type that cannot be constructed, or whose
    /// construction fails, yields a failure entry that is also stored.
    /// The constructor runs at most once per type: a type that failed to
    /// build returns the same failure again without another attempt.
    pub fn resolve(&mut self, demand: &Demand) -> Result<Option<Entry>, Entry> {
        let descriptor = &demand.descriptor;
        if let Some(entry) = self.lookup(descriptor) {
            return Ok(Some(entry));
        }
        if descriptor.kind() != TypeKind::Concrete {
            return Ok(None);
        }
        if let Some(failure) = self.failed.get(&descriptor.id()) {
            tracing::trace!(type_name = descriptor.name(), "construction already failed");
            return Err(failure.clone());
        }

        let Some(zero) = demand.zero else {
            tracing::debug!(type_name = descriptor.name(), "no value to resolve");
            let failure = Entry::new(Unresolved::new(descriptor.name()));
            self.provide_entry(failure.clone());
            return Err(failure);
        };

        tracing::trace!(type_name = descriptor.name(), "constructing value");
        let mut target = zero();
        match (self.constructor)(&self.writer, &self.request, target.as_mut()) {
            Ok(()) => {
                let entry = target.into_entry();
                self.provide_entry(entry.clone());
                Ok(Some(entry))
            }
            Err(err) => {
                tracing::debug!(
                    type_name = descriptor.name(),
                    error = %err,
                    "construction failed"
                );
                let failure = Entry::new(err);
                self.failed.insert(descriptor.id(), failure.clone());
                self.provide_entry(failure.clone());
                Err(failure)
            }
        }
    }

    /// Resolves demands left to right, stopping at the first failure.
    pub fn resolve_all(&mut self, demands: &[Demand]) -> Result<Vec<Option<Entry>>, Entry> {
        demands.iter().map(|demand| self.resolve(demand)).collect()
    }

    /// Returns the current response value.
    pub fn response(&self) -> Option<&Entry> {
        self.response.as_ref()
    }

    /// Replaces the current response value.
    pub fn set_response(&mut self, response: Option<Entry>) {
        self.response = response;
    }

    /// Returns the stored value of exactly type `T`.
    pub fn get<T: Value>(&self) -> Option<Arc<T>> {
        self.exact
            .get(&TypeId::of::<T>())
            .and_then(Entry::downcast)
    }

    /// Returns the most recently provided value with capability `C`.
    pub fn latest<C: ?Sized + 'static>(&self) -> Option<Arc<C>> {
        let descriptor = TypeDescriptor::capability::<C>();
        self.lookup(&descriptor).and_then(|entry| entry.view::<C>())
    }

    /// Returns the response write handle.
    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    /// Returns the request read handle.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the number of distinct concrete types stored.
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    /// Returns true if nothing is stored. A seeded broker is never empty.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("types", &self.exact.len())
            .field("provided", &self.ordered.len())
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}
