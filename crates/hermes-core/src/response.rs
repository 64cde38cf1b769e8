//! Response capabilities and ready-made response values.
//!
//! Three capabilities are recognized by the standard finalizer:
//!
//! - [`Failure`] marks the error channel
//! - [`StructuredResponse`] marks values that render themselves
//! - [`Encode`] marks values with a default JSON encoding
//!
//! [`HttpError`], [`JsonResponse`], [`Json`] and [`Handled`] cover the
//! common cases.

use std::io;

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::value::{Capabilities, Value};

/// Content type used for JSON bodies.
pub const APPLICATION_JSON: &str = "application/json";

/// Content type used for plain text bodies.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// The failure capability.
///
/// Every `std::error::Error + Send + Sync` type is a `Failure`; a value is
/// treated as failure-kind by the broker once it registers the capability
/// with [`Capabilities::failure`].
pub trait Failure: std::error::Error + Send + Sync + 'static {}

impl<T> Failure for T where T: std::error::Error + Send + Sync + 'static {}

/// A value that knows how to render itself as a response.
pub trait StructuredResponse: Send + Sync {
    /// Returns the status code to write.
    ///
    /// `None` means the status has already been written to the transport by
    /// an earlier stage and must not be written again.
    fn status(&self) -> Option<StatusCode>;

    /// Writes the response body.
    fn write_body(&self, writer: &mut dyn io::Write) -> io::Result<()>;

    /// Returns the content type of the body, if any.
    fn content_type(&self) -> Option<&'static str> {
        None
    }
}

/// The default JSON encoding capability.
pub trait Encode: Send + Sync {
    /// Writes the compact JSON encoding of the value.
    fn encode(&self, writer: &mut dyn io::Write) -> serde_json::Result<()>;
}

impl<T> Encode for T
where
    T: Serialize + Send + Sync,
{
    fn encode(&self, writer: &mut dyn io::Write) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }
}

/// A failure carrying an HTTP status and a plain text body.
///
/// # Example
///
/// ```rust
/// use hermes_core::{HttpError, StructuredResponse};
/// use http::StatusCode;
///
/// let err = HttpError::new(StatusCode::UNAUTHORIZED, "bad API credentials");
/// assert_eq!(err.to_string(), "http error: 401: bad API credentials");
/// assert_eq!(StructuredResponse::status(&err), Some(StatusCode::UNAUTHORIZED));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("http error: {}: {}", .status.as_u16(), .body)]
pub struct HttpError {
    status: StatusCode,
    body: String,
}

impl HttpError {
    /// Creates an error with the given status and body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `400 Bad Request`.
    pub fn bad_request(body: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, body)
    }

    /// `401 Unauthorized`.
    pub fn unauthorized(body: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, body)
    }

    /// `403 Forbidden`.
    pub fn forbidden(body: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, body)
    }

    /// `404 Not Found`.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, body)
    }

    /// `409 Conflict`.
    pub fn conflict(body: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, body)
    }

    /// Returns the status code.
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Returns the body.
    pub fn body(&self) -> &str {
        &self.body
    }
}

impl StructuredResponse for HttpError {
    fn status(&self) -> Option<StatusCode> {
        Some(self.status)
    }

    fn write_body(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        writer.write_all(self.body.as_bytes())
    }

    fn content_type(&self) -> Option<&'static str> {
        Some(TEXT_PLAIN)
    }
}

impl Value for HttpError {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.failure().structured();
    }
}

/// A response with an explicit status and a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonResponse<T> {
    status: StatusCode,
    body: T,
}

impl<T> JsonResponse<T> {
    /// Creates a response with the given status and body.
    pub fn new(status: StatusCode, body: T) -> Self {
        Self { status, body }
    }

    /// Creates a `200 OK` response.
    pub fn ok(body: T) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Creates a `201 Created` response.
    pub fn created(body: T) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    /// Returns the body.
    pub fn body(&self) -> &T {
        &self.body
    }
}

impl<T> StructuredResponse for JsonResponse<T>
where
    T: Serialize + Send + Sync,
{
    fn status(&self) -> Option<StatusCode> {
        Some(self.status)
    }

    fn write_body(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        serde_json::to_writer(&mut *writer, &self.body)?;
        writer.write_all(b"\n")
    }

    fn content_type(&self) -> Option<&'static str> {
        Some(APPLICATION_JSON)
    }
}

impl<T> Value for JsonResponse<T>
where
    T: Serialize + Send + Sync + 'static,
{
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.structured();
    }
}

/// Wraps any serializable value so it can be returned as a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Value for Json<T>
where
    T: Serialize + Send + Sync + 'static,
{
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.json();
    }
}

/// A failure meaning "the response has already been written".
///
/// A stage that writes to the [`ResponseWriter`](crate::ResponseWriter)
/// itself returns `Handled` to stop the pipeline without the finalizer
/// writing anything further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
#[error("response already written")]
pub struct Handled;

impl StructuredResponse for Handled {
    fn status(&self) -> Option<StatusCode> {
        None
    }

    fn write_body(&self, _writer: &mut dyn io::Write) -> io::Result<()> {
        Ok(())
    }
}

impl Value for Handled {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.failure().structured();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Entry;
    use serde_json::json;

    fn body_of(response: &dyn StructuredResponse) -> String {
        let mut out = Vec::new();
        response.write_body(&mut out).expect("write body");
        String::from_utf8(out).expect("utf-8")
    }

    #[test]
    fn test_http_error_renders_verbatim() {
        let err = HttpError::forbidden("Forbidden.");
        assert_eq!(body_of(&err), "Forbidden.");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.content_type(), Some(TEXT_PLAIN));
    }

    #[test]
    fn test_http_error_is_failure_and_structured() {
        let entry = Entry::new(HttpError::conflict("duplicate pet"));
        assert!(entry.failure().is_some());
        assert!(entry.view::<dyn StructuredResponse>().is_some());
    }

    #[test]
    fn test_json_response_body() {
        let response = JsonResponse::created(json!({"name": "rex"}));
        assert_eq!(response.status(), Some(StatusCode::CREATED));
        assert_eq!(body_of(&response), "{\"name\":\"rex\"}\n");
    }

    #[test]
    fn test_json_response_is_not_failure() {
        let entry = Entry::new(JsonResponse::ok(vec![1]));
        assert!(!entry.descriptor().is_failure());
        assert!(entry.view::<dyn StructuredResponse>().is_some());
    }

    #[test]
    fn test_json_wrapper_encodes_transparently() {
        let entry = Entry::new(Json(json!({"value": 42})));
        let mut out = Vec::new();
        entry
            .view::<dyn Encode>()
            .expect("encode view")
            .encode(&mut out)
            .expect("encode");
        assert_eq!(out, br#"{"value":42}"#);
    }

    #[test]
    fn test_handled_has_no_status() {
        assert_eq!(Handled.status(), None);
        assert_eq!(body_of(&Handled), "");
        assert!(crate::TypeDescriptor::of::<Handled>().is_failure());
    }
}
