//! The staged pipeline controller.
//!
//! A [`Pipeline`] is assembled once with a [`PipelineBuilder`] and then shared,
//! read-only, by every request. Each request gets its own [`Broker`] and is
//! driven through the phases:
//!
//! ```text
//! Init -> PreChecks -> (ShortCircuited | MainRan) -> Finalized -> Done
//! ```
//!
//! The first pre-check that fails or answers early skips the remaining
//! pre-checks and the main handler. Finalizers always run, exactly once.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::{HttpError, Json, Pipeline, Request, standard};
//!
//! fn authorize(request: Request) -> Option<HttpError> {
//!     request
//!         .header("x-api-key")
//!         .is_none()
//!         .then(|| HttpError::unauthorized("missing key"))
//! }
//!
//! let pipeline = Pipeline::builder()
//!     .pre_check(authorize)
//!     .finalizer(standard::respond)
//!     .wrap(|| Json(42));
//!
//! let response = pipeline.serve(http::Request::new(bytes::Bytes::new()));
//! assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
//! ```

use std::fmt;

use bytes::Bytes;

use crate::adapter::{Finalizer, MainHandler, PreCheck, Verdict};
use crate::broker::Broker;
use crate::callable::Callable;
use crate::error::SignatureError;
use crate::resource::{zero_constructor, Constructor};
use crate::transport::{Request, ResponseWriter};

/// Lifecycle phase of a request within a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Broker seeded with the transport handles.
    Init,
    /// Running pre-checks in order.
    PreChecks,
    /// A pre-check stopped the request; the main handler was skipped.
    ShortCircuited,
    /// Every pre-check passed and the main handler ran.
    MainRan,
    /// Every finalizer ran.
    Finalized,
    /// Terminal.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::PreChecks => "pre-checks",
            Self::ShortCircuited => "short-circuited",
            Self::MainRan => "main-ran",
            Self::Finalized => "finalized",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Assembles a [`Pipeline`].
///
/// The wiring methods panic on an invalid signature so misconfigured
/// pipelines fail before serving traffic; the `try_` variants return the
/// error instead.
#[derive(Clone)]
pub struct PipelineBuilder {
    constructor: Constructor,
    pre_checks: Vec<PreCheck>,
    main: Option<MainHandler>,
    finalizers: Vec<Finalizer>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            constructor: zero_constructor(),
            pre_checks: Vec::new(),
            main: None,
            finalizers: Vec::new(),
        }
    }
}

impl PipelineBuilder {
    /// Creates a builder with no stages and a constructor that leaves values
    /// at their defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback constructor.
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = constructor;
        self
    }

    /// Appends a pre-check.
    ///
    /// # Panics
    ///
    /// Panics if the callable takes the response or a type twice.
    pub fn pre_check<F, Args>(self, callable: F) -> Self
    where
        F: Callable<Args>,
        Args: 'static,
    {
        match self.try_pre_check(callable) {
            Ok(builder) => builder,
            Err(err) => panic!("invalid pre-check: {err}"),
        }
    }

    /// Appends a pre-check, returning an error for an invalid signature.
    pub fn try_pre_check<F, Args>(mut self, callable: F) -> Result<Self, SignatureError>
    where
        F: Callable<Args>,
        Args: 'static,
    {
        self.pre_checks.push(PreCheck::new(callable)?);
        Ok(self)
    }

    /// Sets the main handler, replacing any previous one.
    ///
    /// # Panics
    ///
    /// Panics if the callable takes the response or a type twice.
    pub fn main<F, Args>(self, callable: F) -> Self
    where
        F: Callable<Args>,
        Args: 'static,
    {
        match self.try_main(callable) {
            Ok(builder) => builder,
            Err(err) => panic!("invalid main handler: {err}"),
        }
    }

    /// Sets the main handler, returning an error for an invalid signature.
    pub fn try_main<F, Args>(mut self, callable: F) -> Result<Self, SignatureError>
    where
        F: Callable<Args>,
        Args: 'static,
    {
        self.main = Some(MainHandler::new(callable)?);
        Ok(self)
    }

    /// Appends a finalizer. Finalizers run in the order they were added.
    ///
    /// # Panics
    ///
    /// Panics if the callable takes a type twice.
    pub fn finalizer<F, Args>(self, callable: F) -> Self
    where
        F: Callable<Args>,
        Args: 'static,
    {
        match self.try_finalizer(callable) {
            Ok(builder) => builder,
            Err(err) => panic!("invalid finalizer: {err}"),
        }
    }

    /// Appends a finalizer, returning an error for an invalid signature.
    pub fn try_finalizer<F, Args>(mut self, callable: F) -> Result<Self, SignatureError>
    where
        F: Callable<Args>,
        Args: 'static,
    {
        self.finalizers.push(Finalizer::new(callable)?);
        Ok(self)
    }

    /// Builds the pipeline.
    ///
    /// Without a main handler the response is always empty.
    pub fn build(self) -> Pipeline {
        Pipeline {
            constructor: self.constructor,
            pre_checks: self.pre_checks,
            main: self.main,
            finalizers: self.finalizers,
        }
    }

    /// Builds a pipeline sharing this builder's stages around `main`.
    ///
    /// The builder is left untouched so it can wrap other handlers.
    ///
    /// # Panics
    ///
    /// Panics if the callable takes the response or a type twice.
    pub fn wrap<F, Args>(&self, main: F) -> Pipeline
    where
        F: Callable<Args>,
        Args: 'static,
    {
        self.clone().main(main).build()
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("pre_checks", &self.pre_checks.len())
            .field("main", &self.main.is_some())
            .field("finalizers", &self.finalizers.len())
            .finish_non_exhaustive()
    }
}

/// An assembled, immutable pipeline.
#[derive(Clone)]
pub struct Pipeline {
    constructor: Constructor,
    pre_checks: Vec<PreCheck>,
    main: Option<MainHandler>,
    finalizers: Vec<Finalizer>,
}

impl Pipeline {
    /// Creates a new builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns the number of pre-checks.
    pub fn pre_check_count(&self) -> usize {
        self.pre_checks.len()
    }

    /// Returns the number of finalizers.
    pub fn finalizer_count(&self) -> usize {
        self.finalizers.len()
    }

    /// Creates a broker for one request, seeded with the transport handles.
    pub fn broker(&self, writer: ResponseWriter, request: Request) -> Broker {
        Broker::new(writer, request, self.constructor.clone())
    }

    /// Drives a request through every phase.
    ///
    /// Returns [`Phase::ShortCircuited`] if a pre-check stopped the request
    /// and [`Phase::MainRan`] otherwise.
    pub fn run(&self, broker: &mut Broker) -> Phase {
        tracing::debug!(phase = %Phase::PreChecks, "entering phase");
        let mut branch = Phase::MainRan;

        for (index, check) in self.pre_checks.iter().enumerate() {
            match check.run(broker) {
                Verdict::Continue => {}
                Verdict::Fail(failure) => {
                    tracing::debug!(index, failure = failure.type_name(), "pre-check failed");
                    branch = Phase::ShortCircuited;
                    break;
                }
                Verdict::Respond(response) => {
                    tracing::debug!(index, response = response.type_name(), "pre-check responded");
                    broker.set_response(Some(response));
                    branch = Phase::ShortCircuited;
                    break;
                }
            }
        }

        tracing::debug!(phase = %branch, "entering phase");
        if branch == Phase::MainRan {
            let response = self.main.as_ref().and_then(|main| main.run(broker));
            broker.set_response(response);
        }

        for finalizer in &self.finalizers {
            finalizer.run(broker);
        }
        tracing::debug!(phase = %Phase::Finalized, "entering phase");

        branch
    }

    /// Handles one request against the given transport handles.
    pub fn handle(&self, writer: ResponseWriter, request: Request) -> Phase {
        tracing::debug!(phase = %Phase::Init, "entering phase");
        let mut broker = self.broker(writer, request);
        let branch = self.run(&mut broker);
        tracing::debug!(phase = %Phase::Done, "entering phase");
        branch
    }

    /// Handles an HTTP request and returns the written response.
    pub fn serve(&self, request: http::Request<Bytes>) -> http::Response<Bytes> {
        self.serve_request(Request::from_http(request))
    }

    /// Handles a request handle and returns the written response.
    pub fn serve_request(&self, request: Request) -> http::Response<Bytes> {
        let writer = ResponseWriter::new();
        self.handle(writer.clone(), request);
        writer.finish()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("pre_checks", &self.pre_checks)
            .field("main", &self.main)
            .field("finalizers", &self.finalizers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{Response, Shared};
    use crate::response::{Failure, HttpError, Json};
    use crate::standard;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};

    #[derive(Debug, Clone, Copy)]
    struct Token(u32);
    crate::value!(Token);

    fn request() -> Request {
        Request::from_http(http::Request::new(Bytes::new()))
    }

    #[test]
    #[should_panic(expected = "invalid pre-check")]
    fn test_wiring_panics_on_open_pre_check() {
        let _ = Pipeline::builder().pre_check(|_: Response| {});
    }

    #[test]
    fn test_try_main_reports_error() {
        let result = Pipeline::builder().try_main(|_: Request, _: Request| {});
        assert!(result.is_err());
    }

    #[test]
    fn test_short_circuit_skips_main() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let pipeline = Pipeline::builder()
            .pre_check(|| HttpError::forbidden("no"))
            .finalizer(standard::respond)
            .wrap(move || {
                seen.fetch_add(1, Ordering::SeqCst);
                Json("unreachable")
            });

        let phase = pipeline.handle(ResponseWriter::new(), request());
        assert_eq!(phase, Phase::ShortCircuited);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pre_check_outputs_reach_main() {
        let pipeline = Pipeline::builder()
            .pre_check(|| Token(7))
            .finalizer(standard::respond)
            .wrap(|token: Shared<Token>| {
                let Token(value) = *token;
                Json(value)
            });

        let response = pipeline.serve(http::Request::new(Bytes::new()));
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"7\n");
    }

    #[test]
    fn test_failed_main_leaves_response_empty() {
        let pipeline = Pipeline::builder()
            .finalizer(|response: Response, failure: crate::LastFailure| {
                assert!(response.is_empty());
                assert!(failure.is_some());
            })
            .wrap(|| -> Result<Json<u32>, HttpError> { Err(HttpError::not_found("missing")) });

        assert_eq!(pipeline.handle(ResponseWriter::new(), request()), Phase::MainRan);
    }

    #[test]
    fn test_finalizers_run_in_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let first = Arc::clone(&order);
        let second = Arc::clone(&order);
        let pipeline = Pipeline::builder()
            .finalizer(move || first.lock().push("first"))
            .finalizer(move || second.lock().push("second"))
            .build();

        pipeline.handle(ResponseWriter::new(), request());
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_wrap_keeps_builder_reusable() {
        let builder = Pipeline::builder().finalizer(standard::respond);
        let one = builder.wrap(|| Json(1));
        let two = builder.wrap(|| Json(2));

        assert_eq!(one.serve(http::Request::new(Bytes::new())).body().as_ref(), b"1\n");
        assert_eq!(two.serve(http::Request::new(Bytes::new())).body().as_ref(), b"2\n");
    }

    #[derive(Clone, Default)]
    struct PhaseLog(Arc<parking_lot::Mutex<Vec<String>>>);

    struct PhaseField(Option<String>);

    impl Visit for PhaseField {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "phase" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: Subscriber> Layer<S> for PhaseLog {
        fn on_event(&self, event: &Event<'_>, _: layer::Context<'_, S>) {
            let mut phase = PhaseField(None);
            event.record(&mut phase);
            if let Some(phase) = phase.0 {
                self.0.lock().push(phase);
            }
        }
    }

    fn traced_phases(pipeline: &Pipeline, log: &PhaseLog) -> Vec<String> {
        let subscriber = tracing_subscriber::registry().with(log.clone());
        tracing::subscriber::with_default(subscriber, || {
            pipeline.handle(ResponseWriter::new(), request());
        });
        log.0.lock().clone()
    }

    #[test]
    fn test_phase_is_logged_before_main_runs() {
        let log = PhaseLog::default();
        let marker = log.clone();
        let pipeline = Pipeline::builder()
            .finalizer(|| {})
            .wrap(move || marker.0.lock().push("main".to_string()));

        assert_eq!(
            traced_phases(&pipeline, &log),
            ["init", "pre-checks", "main-ran", "main", "finalized", "done"]
        );
    }

    #[test]
    fn test_short_circuit_is_logged_before_finalizers() {
        let log = PhaseLog::default();
        let marker = log.clone();
        let pipeline = Pipeline::builder()
            .pre_check(|| HttpError::forbidden("no"))
            .finalizer(move || marker.0.lock().push("finalizer".to_string()))
            .wrap(|| Json("unreachable"));

        assert_eq!(
            traced_phases(&pipeline, &log),
            ["init", "pre-checks", "short-circuited", "finalizer", "finalized", "done"]
        );
    }

    #[test]
    fn test_run_exposes_broker_state() {
        let pipeline = Pipeline::builder()
            .pre_check(|| -> Option<HttpError> { None })
            .wrap(|| Token(1));
        let mut broker = pipeline.broker(ResponseWriter::new(), request());

        assert_eq!(pipeline.run(&mut broker), Phase::MainRan);
        assert!(broker.response().is_some());
        assert!(broker.latest::<dyn Failure>().is_none());
    }
}
