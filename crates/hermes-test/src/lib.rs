//! # Hermes Test
//!
//! Testing utilities for Hermes pipelines.
//!
//! [`TestClient`] sends requests through a pipeline or router in-process,
//! with no socket and no runtime, and wraps the result in a
//! [`TestResponse`] with chaining assertions.
//!
//! ## Example
//!
//! ```rust
//! use hermes_core::{standard, HttpError, Json, Pipeline, Request};
//! use hermes_server::Router;
//! use hermes_test::TestClient;
//! use http::{Method, StatusCode};
//!
//! fn require_key(request: Request) -> Result<(), HttpError> {
//!     match request.header("x-api-key") {
//!         Some("secret") => Ok(()),
//!         _ => Err(HttpError::unauthorized("missing api key")),
//!     }
//! }
//!
//! let base = Pipeline::builder()
//!     .pre_check(require_key)
//!     .finalizer(standard::respond);
//! let router = Router::new().route(Method::GET, "/pets", base.wrap(|| Json(Vec::<String>::new())));
//! let client = TestClient::new(router);
//!
//! client.get("/pets").send().assert_status(StatusCode::UNAUTHORIZED);
//! client
//!     .get("/pets")
//!     .header("x-api-key", "secret")
//!     .send()
//!     .assert_success()
//!     .assert_json_eq(&serde_json::json!([]));
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
