//! Buffered responses and their assertions.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::TestError;

/// A finished response.
///
/// Every `assert_*` method panics with the status and body in the message
/// and returns `&Self`, so checks chain:
///
/// ```rust
/// use hermes_test::TestResponse;
/// use http::StatusCode;
///
/// let response = TestResponse::from_http(
///     http::Response::builder()
///         .status(201)
///         .header("content-type", "application/json")
///         .body(bytes::Bytes::from_static(b"{\"name\":\"Rex\"}\n"))
///         .unwrap(),
/// );
/// response
///     .assert_status(StatusCode::CREATED)
///     .assert_content_type("application/json")
///     .assert_json_field("name", &serde_json::json!("Rex"));
/// ```
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Takes ownership of a pipeline's response.
    #[must_use]
    pub fn from_http(response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self::new(parts.status, parts.headers, body)
    }

    #[must_use]
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self { status, headers, body }
    }

    /// Response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response status as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 4xx.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// All response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header's value, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The Content-Type header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// [`TestError::BodyRead`] for non-UTF-8 bodies.
    pub fn text(&self) -> Result<&str, TestError> {
        std::str::from_utf8(&self.body).map_err(|e| TestError::BodyRead(e.to_string()))
    }

    /// Parses the body as JSON. A trailing newline is fine.
    ///
    /// # Errors
    ///
    /// [`TestError::Json`] when the body does not decode into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    fn expect_text(&self) -> &str {
        match self.text() {
            Ok(text) => text,
            Err(e) => panic!("{} response body: {e}", self.status),
        }
    }

    fn expect_json(&self) -> JsonValue {
        match self.json() {
            Ok(value) => value,
            Err(e) => panic!("{} response is not JSON ({e}): {:?}", self.status, self.body),
        }
    }

    /// # Panics
    ///
    /// When the status differs.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert!(
            self.status == expected,
            "Expected status {expected}, got {} with body {:?}",
            self.status,
            self.body
        );
        self
    }

    /// Numeric form of [`assert_status`](Self::assert_status).
    ///
    /// # Panics
    ///
    /// When the status differs.
    pub fn assert_status_code(&self, expected: u16) -> &Self {
        match StatusCode::from_u16(expected) {
            Ok(status) => self.assert_status(status),
            Err(_) => panic!("{expected} is not a status code"),
        }
    }

    /// # Panics
    ///
    /// Unless the status is 2xx.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.is_success(),
            "Expected a 2xx status, got {} with body {:?}",
            self.status,
            self.body
        );
        self
    }

    /// # Panics
    ///
    /// When the header is missing or has another value.
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        assert_eq!(self.header(name), Some(expected), "header {name}");
        self
    }

    /// Matches the media type only, so `"text/plain"` accepts
    /// `text/plain; charset=utf-8`.
    ///
    /// # Panics
    ///
    /// When Content-Type is missing or has another media type.
    pub fn assert_content_type(&self, expected: &str) -> &Self {
        let actual = self.content_type().unwrap_or_default();
        assert!(
            actual.starts_with(expected),
            "Expected content-type {expected}, got {actual:?}"
        );
        self
    }

    /// # Panics
    ///
    /// When the body does not contain `needle`.
    pub fn assert_body_contains(&self, needle: &str) -> &Self {
        let body = self.expect_text();
        assert!(body.contains(needle), "{needle:?} not found in body {body:?}");
        self
    }

    /// # Panics
    ///
    /// When the body is not exactly `expected`.
    pub fn assert_body_eq(&self, expected: &str) -> &Self {
        assert_eq!(self.expect_text(), expected);
        self
    }

    /// # Panics
    ///
    /// When the body is not JSON equal to `expected`.
    pub fn assert_json_eq(&self, expected: &JsonValue) -> &Self {
        assert_eq!(&self.expect_json(), expected);
        self
    }

    /// Compares one field addressed by a dotted path; numeric segments
    /// index arrays (`"pets.0.name"`).
    ///
    /// # Panics
    ///
    /// When the path is absent or the field differs.
    pub fn assert_json_field(&self, path: &str, expected: &JsonValue) -> &Self {
        let json = self.expect_json();
        match json_path(&json, path) {
            Some(actual) => assert_eq!(actual, expected, "at {path}"),
            None => panic!("JSON path '{path}' not found in {json}"),
        }
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type())
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish_non_exhaustive()
    }
}

fn json_path<'a>(root: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .filter(|step| !step.is_empty())
        .try_fold(root, |node, step| match step.parse::<usize>() {
            Ok(index) => node.get(index),
            Err(_) => node.get(step),
        })
}
