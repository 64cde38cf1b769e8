//! In-process test client.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use hermes_core::TEXT_PLAIN;
use hermes_server::{Dispatch, NOT_FOUND_BODY};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// Runs requests through pipelines without a socket.
///
/// Anything that implements [`Dispatch`] can be tested: a single
/// [`Pipeline`](hermes_core::Pipeline), a [`Router`](hermes_server::Router)
/// or a closure. Pipelines run synchronously on the calling thread, so tests
/// need no runtime.
///
/// # Example
///
/// ```rust
/// use hermes_core::{standard, Json, Pipeline};
/// use hermes_test::TestClient;
///
/// let pipeline = Pipeline::builder()
///     .finalizer(standard::respond)
///     .wrap(|| Json("pong"));
///
/// let client = TestClient::new(pipeline);
/// client.get("/ping").send().assert_status_code(200).assert_body_eq("\"pong\"\n");
/// ```
#[must_use]
pub struct TestClient {
    dispatch: Arc<dyn Dispatch>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a test client for a dispatcher.
    pub fn new<D: Dispatch>(dispatch: D) -> Self {
        Self {
            dispatch: Arc::new(dispatch),
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Creates a GET request.
    pub fn get(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(uri))
    }

    /// Creates a POST request.
    pub fn post(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(uri))
    }

    /// Creates a PUT request.
    pub fn put(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::put(uri))
    }

    /// Creates a PATCH request.
    pub fn patch(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::patch(uri))
    }

    /// Creates a DELETE request.
    pub fn delete(&self, uri: impl Into<String>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::delete(uri))
    }

    /// Creates a request with a custom method.
    pub fn request(&self, method: Method, uri: impl Into<String>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::builder(method, uri))
    }

    /// Dispatches a built request. Unmatched requests get the same `404`
    /// the server sends.
    #[must_use]
    pub fn execute(&self, request: TestRequest) -> TestResponse {
        let Some(route) = self.dispatch.dispatch(request.method(), request.uri().path()) else {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
            return TestResponse::new(StatusCode::NOT_FOUND, headers, Bytes::from_static(NOT_FOUND_BODY.as_bytes()));
        };
        let (pipeline, params) = route.into_parts();
        TestResponse::from_http(pipeline.serve_request(request.into_request(params)))
    }
}

impl fmt::Debug for TestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestClient")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

/// A request builder bound to a test client.
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, mut builder: TestRequestBuilder) -> Self {
        for (name, value) in &client.default_headers {
            builder = builder.header(name, value);
        }
        Self { client, builder }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    #[must_use]
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets a bearer token Authorization header.
    #[must_use]
    pub fn bearer_token(mut self, token: &str) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Adds a cookie.
    #[must_use]
    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.cookie(name, value);
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.query(name, value);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built.
    pub fn send(self) -> TestResponse {
        self.try_send()
            .unwrap_or_else(|e| panic!("failed to build test request: {e}"))
    }

    /// Sends the request, returning build errors.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building the request.
    pub fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        Ok(self.client.execute(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{standard, HttpError, Json, Pipeline, Request};
    use hermes_server::Router;
    use serde_json::json;

    fn echo() -> Pipeline {
        Pipeline::builder()
            .finalizer(standard::respond)
            .wrap(|request: Request| {
                Json(json!({
                    "method": request.method().as_str(),
                    "path": request.path(),
                    "query": request.query(),
                    "key": request.header("x-api-key"),
                    "name": request.segment("name"),
                }))
            })
    }

    #[test]
    fn test_pipeline_as_dispatcher() {
        let client = TestClient::new(echo());
        client
            .post("/anything")
            .query("q", "a b")
            .send()
            .assert_status(StatusCode::OK)
            .assert_json_field("method", &json!("POST"))
            .assert_json_field("query", &json!("q=a+b"));
    }

    #[test]
    fn test_router_segments_and_not_found() {
        let router = Router::new().route(Method::GET, "/pets/{name}", echo());
        let client = TestClient::new(router);

        client
            .get("/pets/rex")
            .send()
            .assert_json_field("name", &json!("rex"));

        client
            .get("/owners")
            .send()
            .assert_status(StatusCode::NOT_FOUND)
            .assert_content_type("text/plain")
            .assert_body_eq("404 page not found\n");
    }

    #[test]
    fn test_default_headers() {
        let client = TestClient::new(echo()).with_default_header("x-api-key", "secret");
        client
            .get("/")
            .send()
            .assert_json_field("key", &json!("secret"));
    }

    #[test]
    fn test_error_responses() {
        let pipeline = Pipeline::builder()
            .finalizer(standard::respond)
            .wrap(|| -> Result<Json<u8>, HttpError> { Err(HttpError::forbidden("no")) });
        let client = TestClient::new(pipeline);
        let response = client.delete("/pets/rex").send();
        assert!(response.is_client_error());
        response.assert_status(StatusCode::FORBIDDEN).assert_body_eq("no");
    }

    #[test]
    fn test_try_send_reports_build_errors() {
        let client = TestClient::new(echo());
        let err = client.get("/").header("bad header", "x").try_send().unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }
}
