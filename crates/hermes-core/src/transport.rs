//! Transport handles seeded into every broker.
//!
//! [`Request`] is the read handle and [`ResponseWriter`] the write handle of
//! one exchange. Both are cheap to clone; clones share the same underlying
//! request and response state.

use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::value::Value;

/// Maximum number of path parameters stored inline.
const INLINE_PARAMS: usize = 4;

/// Path parameters attached to a request by the dispatcher.
///
/// # Example
///
/// ```rust
/// use hermes_core::PathParams;
///
/// let mut params = PathParams::new();
/// params.push("name", "rex");
///
/// assert_eq!(params.get("name"), Some("rex"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathParams {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl PathParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter. Later parameters shadow earlier ones of the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value for a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}

#[derive(Debug, Clone)]
struct RequestParts {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    segments: PathParams,
}

/// The read handle of an exchange: method, URI, headers, body and the path
/// parameters found by the dispatcher.
#[derive(Debug, Clone)]
pub struct Request {
    inner: Arc<RequestParts>,
}

impl Request {
    /// Creates a request from its parts.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            inner: Arc::new(RequestParts {
                method,
                uri,
                headers,
                body,
                segments: PathParams::new(),
            }),
        }
    }

    /// Creates a request from a fully buffered `http::Request`.
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }

    /// Returns a copy of this request carrying the given path parameters.
    pub fn with_segments(mut self, segments: PathParams) -> Self {
        Arc::make_mut(&mut self.inner).segments = segments;
        self
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Returns the URI path.
    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    /// Returns the raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.inner.uri.query()
    }

    /// Returns all request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Returns the first value of a header as a string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns the buffered body.
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Returns the path parameters.
    pub fn segments(&self) -> &PathParams {
        &self.inner.segments
    }

    /// Returns a path parameter by name.
    pub fn segment(&self, name: &str) -> Option<&str> {
        self.inner.segments.get(name)
    }
}

impl Value for Request {}

#[derive(Debug, Default)]
struct WriterState {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

/// The write handle of an exchange.
///
/// The first status written wins; writing body bytes before any status
/// implies `200 OK`. Clones share the same response.
///
/// # Example
///
/// ```rust
/// use hermes_core::ResponseWriter;
/// use http::StatusCode;
/// use std::io::Write;
///
/// let mut writer = ResponseWriter::new();
/// writer.write_header(StatusCode::CREATED);
/// writer.write_header(StatusCode::OK);
/// write!(writer, "HELLO").unwrap();
///
/// let response = writer.finish();
/// assert_eq!(response.status(), StatusCode::CREATED);
/// assert_eq!(response.body().as_ref(), b"HELLO");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    state: Arc<Mutex<WriterState>>,
}

impl ResponseWriter {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the status code. Returns false if a status was already written.
    pub fn write_header(&self, status: StatusCode) -> bool {
        let mut state = self.state.lock();
        match state.status {
            Some(existing) => {
                tracing::debug!(
                    existing = existing.as_u16(),
                    ignored = status.as_u16(),
                    "superfluous status write"
                );
                false
            }
            None => {
                state.status = Some(status);
                true
            }
        }
    }

    /// Sets a response header, replacing any previous value.
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.state.lock().headers.insert(name, value);
    }

    /// Appends bytes to the body, writing `200 OK` first if needed.
    pub fn write_body(&self, bytes: &[u8]) {
        let mut state = self.state.lock();
        state.status.get_or_insert(StatusCode::OK);
        state.body.extend_from_slice(bytes);
    }

    /// Returns the written status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.state.lock().status
    }

    /// Returns true once a status has been written.
    pub fn is_committed(&self) -> bool {
        self.state.lock().status.is_some()
    }

    /// Returns a copy of a response header.
    pub fn header(&self, name: &str) -> Option<HeaderValue> {
        self.state.lock().headers.get(name).cloned()
    }

    /// Returns a copy of the body written so far.
    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state.lock().body)
    }

    /// Takes the written response, leaving this writer empty.
    ///
    /// A response that never had a status written is `200 OK`.
    pub fn finish(&self) -> http::Response<Bytes> {
        let mut state = self.state.lock();
        let status = state.status.take().unwrap_or(StatusCode::OK);
        let headers = std::mem::take(&mut state.headers);
        let body = std::mem::take(&mut state.body).freeze();
        drop(state);

        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for &ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Value for ResponseWriter {}
