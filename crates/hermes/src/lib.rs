//! # Hermes
//!
//! **Request-scoped dependency resolution and staged handler pipelines**
//!
//! Hermes runs plain functions as HTTP handlers. Each function declares what
//! it needs by its parameter types and what it produces by its return type;
//! a per-request broker resolves the parameters from values produced earlier,
//! or builds them from the request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hermes::prelude::*;
//!
//! fn require_key(request: Request) -> Result<(), HttpError> {
//!     match request.header("x-api-key") {
//!         Some("secret") => Ok(()),
//!         _ => Err(HttpError::unauthorized("Unauthorized.")),
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let base = hermes::standard().pre_check(require_key);
//!     let router = Router::new().route(Method::GET, "/ping", base.wrap(|| Json("pong")));
//!
//!     Server::builder().http_addr("127.0.0.1:8080").build().serve(router).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Every request runs through a fixed sequence of stages:
//!
//! ```text
//! Request → pre-check → pre-check → ... → main
//!                 │ failure or early response      │
//!                 └──────────────┬──────────────────┘
//!                                ↓
//!                  finalizer → finalizer → ... → Response
//! ```
//!
//! | crate | role |
//! |-------|------|
//! | [`core`] | values, broker, stage adapters, pipeline, standard finalizer |
//! | [`extract`] | the request decoder used as fallback constructor |
//! | [`config`] | layered configuration |
//! | [`telemetry`] | structured logging |
//! | [`server`] | HTTP/1 server and router |

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use hermes_config::DecoderConfig;
use hermes_core::{standard as finalizers, PipelineBuilder};
use hermes_extract::Decoder;

// Re-export core types
pub use hermes_core as core;

// Re-export the request decoder
pub use hermes_extract as extract;

// Re-export configuration
pub use hermes_config as config;

// Re-export logging setup
pub use hermes_telemetry as telemetry;

// Re-export the server
pub use hermes_server as server;

/// Returns a builder with the standard decoder as fallback constructor and the
/// standard response finalizer.
///
/// Pre-checks added to the returned builder run before every main handler
/// wrapped with [`PipelineBuilder::wrap`].
pub fn standard() -> PipelineBuilder {
    with_decoder(Decoder::standard())
}

/// Like [`standard`], with the decoder configured from `config`.
pub fn standard_with(config: &DecoderConfig) -> PipelineBuilder {
    with_decoder(Decoder::standard().require_json(config.require_json_content_type))
}

fn with_decoder(decoder: Decoder) -> PipelineBuilder {
    PipelineBuilder::new()
        .constructor(decoder.into_constructor())
        .finalizer(finalizers::respond)
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use hermes_core::{
        standard, Binding, Capabilities, ConstructError, Failure, Handled, HttpError, Json,
        JsonResponse, LastFailure, Latest, Phase, Pipeline, PipelineBuilder, Request, Resource,
        Response, ResponseWriter, Shared, StructuredResponse, Value,
    };

    pub use hermes_extract::{Decoder, ExtractionError};

    pub use hermes_config::{ConfigLoader, HermesConfig};

    pub use hermes_telemetry::{init_logging, LogConfig};

    pub use hermes_server::{Dispatch, Router, Server, ShutdownSignal};

    pub use http::{Method, StatusCode};
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::Json;

    #[test]
    fn test_standard_pipeline_responds() {
        let pipeline = standard().wrap(|| Json(vec![1, 2]));
        let response = pipeline.serve(http::Request::new(bytes::Bytes::new()));
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"[1,2]\n");
    }

    #[derive(Debug, Clone, Default, serde::Deserialize)]
    struct Body {
        #[serde(default)]
        name: String,
    }

    hermes_core::value!(Body);
    impl hermes_core::Resource for Body {}

    #[test]
    fn test_standard_with_requires_json() {
        let config = DecoderConfig {
            require_json_content_type: true,
        };
        let pipeline = standard_with(&config).wrap(|body: Body| Json(body.name));
        let request = http::Request::builder()
            .header("content-type", "text/plain")
            .body(bytes::Bytes::from_static(b"{}"))
            .unwrap();
        let response = pipeline.serve(request);
        assert_eq!(response.status(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let request = http::Request::builder()
            .header("content-type", "application/json")
            .body(bytes::Bytes::from_static(br#"{"name": "Rex"}"#))
            .unwrap();
        assert_eq!(pipeline.serve(request).body().as_ref(), b"\"Rex\"\n");
    }
}
