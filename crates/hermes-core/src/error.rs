//! Error types for pipeline wiring and value resolution.
//!
//! [`SignatureError`] is a wiring-time error: it is raised while a pipeline is
//! assembled and never reaches a live request. [`Unresolved`] and
//! [`ConstructError`] are request-time failures; they are stored in the broker
//! like any other failure value so finalizers can render them.

use std::io;

use http::StatusCode;
use thiserror::Error;

use crate::descriptor::Stage;
use crate::response::StructuredResponse;
use crate::value::{Capabilities, Value};

/// An invalid callable signature, detected while wiring a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The open capability was requested before a response can exist.
    #[error("{stage} cannot take the response as input (parameter {index})")]
    OpenInput {
        /// Stage the callable was wired into.
        stage: Stage,
        /// Position of the offending parameter.
        index: usize,
    },

    /// The same type was requested twice.
    #[error("{stage} takes {type_name} more than once (parameters {first} and {second})")]
    DuplicateInput {
        /// Stage the callable was wired into.
        stage: Stage,
        /// Name of the repeated type.
        type_name: &'static str,
        /// Position of the first occurrence.
        first: usize,
        /// Position of the repeated occurrence.
        second: usize,
    },
}

/// A lookup-only parameter had no value in the broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no value available for {type_name}")]
pub struct Unresolved {
    type_name: &'static str,
}

impl Unresolved {
    /// Creates the failure for the named type.
    pub fn new(type_name: &'static str) -> Self {
        Self { type_name }
    }

    /// Returns the name of the missing type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl StructuredResponse for Unresolved {
    fn status(&self) -> Option<StatusCode> {
        Some(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn write_body(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        writeln!(writer, "{self}")
    }
}

impl Value for Unresolved {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.failure().structured();
    }
}

/// A fallback constructor could not populate a requested value.
///
/// # Example
///
/// ```rust
/// use hermes_core::ConstructError;
/// use http::StatusCode;
///
/// let err = ConstructError::bad_request("invalid JSON body");
/// assert_eq!(err.status(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.to_string(), "invalid JSON body");
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConstructError {
    status: StatusCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConstructError {
    /// Creates a construction failure with the given status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a `400 Bad Request` construction failure.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the status this failure renders with.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl StructuredResponse for ConstructError {
    fn status(&self) -> Option<StatusCode> {
        Some(self.status)
    }

    fn write_body(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        writeln!(writer, "{}", self.message)
    }
}

impl Value for ConstructError {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.failure().structured();
    }
}
