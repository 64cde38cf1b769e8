//! # Hermes Core
//!
//! Request-scoped typed value broker and staged handler pipeline.
//!
//! Handlers are plain functions whose parameter and return types declare what
//! they need and what they produce. For every request a [`Broker`] resolves
//! each parameter from values produced earlier, from the most recent value
//! satisfying a capability, or by constructing it from the request, and folds
//! every return value back in for later stages.
//!
//! - [`Pipeline`] / [`PipelineBuilder`] - pre-checks, a main handler and finalizers
//! - [`Broker`] - the per-request, type-keyed value store
//! - [`Value`] / [`Capabilities`] - explicit capability tables
//! - [`Param`] / [`Outputs`] - how parameters resolve and results are stored
//! - [`Resource`] / [`Constructor`] - values built from the request on demand
//! - [`HttpError`], [`JsonResponse`], [`Json`], [`Handled`] - ready-made responses
//! - [`standard::respond`] - the standard finalizer

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod adapter;
mod broker;
mod callable;
mod descriptor;
mod document;
mod error;
mod output;
mod param;
mod pipeline;
mod resource;
mod response;
pub mod standard;
mod transport;
mod value;

pub use adapter::{Finalizer, MainHandler, PreCheck, Verdict};
pub use broker::Broker;
pub use callable::Callable;
pub use descriptor::{Signature, Stage, TypeDescriptor, TypeKind};
pub use document::{Document, Part};
pub use error::{ConstructError, SignatureError, Unresolved};
pub use output::{Outputs, Produce, Slot};
pub use param::{Demand, LastFailure, Latest, Param, Response, Shared};
pub use pipeline::{Phase, Pipeline, PipelineBuilder};
pub use resource::{constructor, zero_constructor, Binding, Constructor, Resource, Source, Target};
pub use response::{
    Encode, Failure, Handled, HttpError, Json, JsonResponse, StructuredResponse, APPLICATION_JSON,
    TEXT_PLAIN,
};
pub use transport::{PathParams, Request, ResponseWriter};
pub use value::{Capabilities, Entry, Value};
