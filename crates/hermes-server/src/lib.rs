//! # Hermes Server
//!
//! Serves Hermes pipelines over HTTP/1.1 with Hyper and Tokio.
//!
//! - A [`Dispatch`] (a single [`Pipeline`](hermes_core::Pipeline), a
//!   [`Router`], or a closure) picks the pipeline for each request
//! - Request bodies are buffered within a size limit and a timeout
//! - Pipelines run on the blocking pool, one request per task
//! - Every request gets a UUIDv7 `x-request-id` and a tracing span
//! - Shutdown stops accepting and waits for open connections
//!
//! ## Example
//!
//! ```rust,no_run
//! use hermes_core::{standard, Json, Pipeline};
//! use hermes_server::{Router, Server, ShutdownSignal};
//! use http::Method;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hermes_server::ServerError> {
//!     let health = Pipeline::builder()
//!         .finalizer(standard::respond)
//!         .wrap(|| Json("ok"));
//!
//!     let router = Router::new().route(Method::GET, "/health", health);
//!
//!     let shutdown = ShutdownSignal::with_os_signals();
//!     Server::builder()
//!         .http_addr("127.0.0.1:8080")
//!         .build()
//!         .serve_with_shutdown(router, shutdown)
//!         .await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod router;
mod server;
mod shutdown;

pub use config::ServerConfig;
pub use router::{Dispatch, RouteMatch, Router};
pub use server::{
    HttpResponse, ResponseBody, Server, ServerBuilder, ServerError, NOT_FOUND_BODY,
    REQUEST_ID_HEADER,
};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
