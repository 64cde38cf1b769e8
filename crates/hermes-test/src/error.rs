//! Failures while building requests or reading responses.

use thiserror::Error;

/// Returned by the fallible helpers; the `assert_*` methods panic instead.
#[derive(Debug, Error)]
pub enum TestError {
    /// The method, URI or body did not make a valid request.
    #[error("cannot build request: {0}")]
    RequestBuild(String),

    /// A header name or value is not valid HTTP.
    #[error("bad header {0}")]
    InvalidHeader(String),

    /// The body is not UTF-8.
    #[error("unreadable body: {0}")]
    BodyRead(String),

    /// JSON encoding of a request or decoding of a response.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
