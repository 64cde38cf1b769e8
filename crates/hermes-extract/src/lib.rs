//! # Hermes Extract
//!
//! The standard fallback constructor for Hermes pipelines.
//!
//! When a handler asks for a [`Resource`](hermes_core::Resource) nothing has
//! produced yet, the broker hands a zero value to the pipeline's constructor.
//! The [`Decoder`] in this crate fills it from the request:
//!
//! | Binding | Source | Default behaviour |
//! |---------|--------|-------------------|
//! | (none) | Request body | JSON; an empty body leaves the value untouched |
//! | [`Binding::header`](hermes_core::Binding::header) | Headers | First value of the header |
//! | [`Binding::segment`](hermes_core::Binding::segment) | Path | Segment captured by the dispatcher |
//! | [`Binding::query`](hermes_core::Binding::query) | Query string | Exactly one percent-decoded value |
//! | [`Binding::query_all`](hermes_core::Binding::query_all) | Query string | Every percent-decoded value |
//! | [`Binding::cookie`](hermes_core::Binding::cookie) | Cookies | Cookie value, path-unescaped when valid |
//!
//! Bound values are strings coerced into the field type: numbers, booleans
//! and JSON documents parse, anything else is taken as a string.
//!
//! ## Example
//!
//! ```rust
//! use hermes_core::{Binding, Pipeline, Resource};
//! use hermes_extract::Decoder;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Clone, Default, Deserialize)]
//! #[serde(default)]
//! struct ListParams {
//!     limit: u32,
//! }
//!
//! hermes_core::value!(ListParams);
//!
//! impl Resource for ListParams {
//!     fn bindings() -> &'static [Binding] {
//!         const BINDINGS: &[Binding] = &[Binding::query("limit", "limit")];
//!         BINDINGS
//!     }
//! }
//!
//! let pipeline = Pipeline::builder()
//!     .constructor(Decoder::standard().into_constructor())
//!     .wrap(|params: ListParams| hermes_core::Json(params.limit));
//! # let _ = pipeline;
//! ```
//!
//! ## Error Handling
//!
//! Decoding failures are [`ExtractionError`]s. Converted into a
//! [`ConstructError`](hermes_core::ConstructError) they render as
//! `400 Bad Request`, or `415 Unsupported Media Type` when JSON bodies are
//! required.

#![doc(html_root_url = "https://docs.rs/hermes-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod decoder;
mod error;
pub mod source;

pub use decoder::{BodyFn, Decoder, ValueFn, ValuesFn};
pub use error::{ExtractionError, ExtractionSource};
