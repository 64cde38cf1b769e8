//! Test request building.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Method, Uri};
use hermes_core::{PathParams, Request};
use serde::Serialize;

use crate::error::TestError;

/// A request ready to be sent through a pipeline.
///
/// # Example
///
/// ```rust
/// use hermes_test::TestRequest;
///
/// let request = TestRequest::post("/pets")
///     .header("x-api-key", "secret")
///     .json(&serde_json::json!({"name": "Rex"}))
///     .build()
///     .unwrap();
/// assert_eq!(request.uri().path(), "/pets");
/// ```
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl TestRequest {
    /// Starts building a request with an arbitrary method.
    pub fn builder(method: Method, uri: impl Into<String>) -> TestRequestBuilder {
        TestRequestBuilder::new(method, uri)
    }

    /// Starts building a GET request.
    pub fn get(uri: impl Into<String>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Starts building a POST request.
    pub fn post(uri: impl Into<String>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Starts building a PUT request.
    pub fn put(uri: impl Into<String>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Starts building a PATCH request.
    pub fn patch(uri: impl Into<String>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Starts building a DELETE request.
    pub fn delete(uri: impl Into<String>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Converts into an `http::Request`.
    #[must_use]
    pub fn into_http_request(self) -> http::Request<Bytes> {
        let mut request = http::Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }

    /// Converts into a pipeline request carrying the given path segments.
    #[must_use]
    pub fn into_request(self, segments: PathParams) -> Request {
        Request::new(self.method, self.uri, self.headers, self.body).with_segments(segments)
    }
}

/// Builder for [`TestRequest`].
///
/// Invalid input does not panic at the call site; the first error is kept and
/// returned from [`build`](Self::build).
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    fn fail(&mut self, error: TestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TestError::InvalidHeader(format!("{name}: {e}")));
        let value = HeaderValue::from_str(value)
            .map_err(|e| TestError::InvalidHeader(format!("{value:?}: {e}")));
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            (Err(e), _) | (_, Err(e)) => self.fail(e),
        }
        self
    }

    /// Appends a header with a typed name.
    #[must_use]
    pub fn header_typed(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the Content-Type header.
    #[must_use]
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.headers.remove(CONTENT_TYPE);
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the Accept header.
    #[must_use]
    pub fn accept(self, accept: &str) -> Self {
        self.header(ACCEPT.as_str(), accept)
    }

    /// Sets a bearer token Authorization header.
    #[must_use]
    pub fn bearer_token(self, token: &str) -> Self {
        self.header(AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }

    /// Adds a cookie, percent-encoding its value.
    #[must_use]
    pub fn cookie(self, name: &str, value: &str) -> Self {
        let cookie = format!("{name}={}", urlencoding::encode(value));
        self.header(COOKIE.as_str(), &cookie)
    }

    /// Appends a query parameter. Repeated calls with the same name add
    /// further values.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and content type.
    #[must_use]
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Bytes::from(bytes);
                self.content_type(hermes_core::APPLICATION_JSON)
            }
            Err(e) => {
                self.fail(TestError::Json(e));
                self
            }
        }
    }

    /// Sets a form-encoded body and content type.
    #[must_use]
    pub fn form<T: Serialize>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => {
                self.body = Bytes::from(encoded);
                self.content_type("application/x-www-form-urlencoded")
            }
            Err(e) => {
                self.fail(TestError::RequestBuild(format!("form encoding failed: {e}")));
                self
            }
        }
    }

    /// Builds the request.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building, or
    /// [`TestError::RequestBuild`] if the URI is invalid.
    pub fn build(self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let uri = if self.query.is_empty() {
            self.uri
        } else {
            let encoded = serde_urlencoded::to_string(&self.query)
                .map_err(|e| TestError::RequestBuild(format!("query encoding failed: {e}")))?;
            let separator = if self.uri.contains('?') { '&' } else { '?' };
            format!("{}{separator}{encoded}", self.uri)
        };
        let uri = uri
            .parse::<Uri>()
            .map_err(|e| TestError::RequestBuild(format!("invalid uri '{uri}': {e}")))?;

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_request() {
        let request = TestRequest::get("/pets").build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/pets");
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request = TestRequest::post("/pets")
            .json(&serde_json::json!({"name": "Rex"}))
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            hermes_core::APPLICATION_JSON
        );
        assert_eq!(request.body().as_ref(), br#"{"name":"Rex"}"#);
    }

    #[test]
    fn test_form_body() {
        let request = TestRequest::post("/login")
            .form(&[("user", "ana b"), ("pass", "x&y")])
            .build()
            .unwrap();
        assert_eq!(request.body().as_ref(), b"user=ana+b&pass=x%26y");
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_query_parameters() {
        let request = TestRequest::get("/pets")
            .query("categories", "dog")
            .query("categories", "big cat")
            .build()
            .unwrap();
        assert_eq!(request.uri().query(), Some("categories=dog&categories=big+cat"));

        let request = TestRequest::get("/pets?limit=1").query("q", "x").build().unwrap();
        assert_eq!(request.uri().query(), Some("limit=1&q=x"));
    }

    #[test]
    fn test_headers_and_cookies() {
        let request = TestRequest::get("/")
            .bearer_token("abc")
            .accept("application/json")
            .cookie("user", "jürgen")
            .build()
            .unwrap();
        assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(request.headers().get(ACCEPT).unwrap(), "application/json");
        assert_eq!(request.headers().get(COOKIE).unwrap(), "user=j%C3%BCrgen");
    }

    #[test]
    fn test_invalid_header_is_reported_at_build() {
        let err = TestRequest::get("/").header("bad header", "v").build().unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));

        let err = TestRequest::get("/").header("x-ok", "line\nbreak").build().unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }

    #[test]
    fn test_invalid_uri() {
        let err = TestRequest::get("not a uri").build().unwrap_err();
        assert!(matches!(err, TestError::RequestBuild(_)));
    }

    #[test]
    fn test_into_request_keeps_segments() {
        let params: PathParams = [("name", "rex")].into_iter().collect();
        let request = TestRequest::delete("/pets/rex")
            .build()
            .unwrap()
            .into_request(params);
        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.segment("name"), Some("rex"));
    }
}
