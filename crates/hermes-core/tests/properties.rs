//! Property tests for the pipeline controller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use hermes_core::{HttpError, Json, JsonResponse, Phase, Pipeline, Request, ResponseWriter};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Pass,
    Fail,
    Respond,
}

impl Outcome {
    fn stops(self) -> bool {
        matches!(self, Self::Fail | Self::Respond)
    }
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Pass),
        Just(Outcome::Fail),
        Just(Outcome::Respond),
    ]
}

fn check(
    outcome: Outcome,
    calls: Arc<AtomicUsize>,
) -> impl Fn() -> (Option<JsonResponse<u32>>, Option<HttpError>) + Send + Sync + 'static {
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        match outcome {
            Outcome::Pass => (None, None),
            Outcome::Fail => (None, Some(HttpError::forbidden("denied"))),
            Outcome::Respond => (Some(JsonResponse::ok(7)), None),
        }
    }
}

struct Counters {
    checks: Arc<AtomicUsize>,
    main: Arc<AtomicUsize>,
    finalizer: Arc<AtomicUsize>,
}

fn pipeline(outcomes: &[Outcome], main_fails: bool) -> (Pipeline, Counters) {
    let counters = Counters {
        checks: Arc::new(AtomicUsize::new(0)),
        main: Arc::new(AtomicUsize::new(0)),
        finalizer: Arc::new(AtomicUsize::new(0)),
    };

    let mut builder = Pipeline::builder();
    for outcome in outcomes {
        builder = builder.pre_check(check(*outcome, Arc::clone(&counters.checks)));
    }

    let finalized = Arc::clone(&counters.finalizer);
    builder = builder.finalizer(move || {
        finalized.fetch_add(1, Ordering::SeqCst);
    });

    let main = Arc::clone(&counters.main);
    let pipeline = builder.wrap(move || -> Result<Json<u32>, HttpError> {
        main.fetch_add(1, Ordering::SeqCst);
        if main_fails {
            Err(HttpError::conflict("conflict"))
        } else {
            Ok(Json(1))
        }
    });

    (pipeline, counters)
}

proptest! {
    #[test]
    fn finalizer_runs_exactly_once(
        outcomes in prop::collection::vec(outcome(), 0..6),
        main_fails in any::<bool>(),
    ) {
        let (pipeline, counters) = pipeline(&outcomes, main_fails);
        let request = Request::from_http(http::Request::new(Bytes::new()));
        let phase = pipeline.handle(ResponseWriter::new(), request);

        prop_assert_eq!(counters.finalizer.load(Ordering::SeqCst), 1);

        let stop = outcomes.iter().position(|outcome| outcome.stops());
        match stop {
            Some(index) => {
                prop_assert_eq!(phase, Phase::ShortCircuited);
                prop_assert_eq!(counters.main.load(Ordering::SeqCst), 0);
                prop_assert_eq!(counters.checks.load(Ordering::SeqCst), index + 1);
            }
            None => {
                prop_assert_eq!(phase, Phase::MainRan);
                prop_assert_eq!(counters.main.load(Ordering::SeqCst), 1);
                prop_assert_eq!(counters.checks.load(Ordering::SeqCst), outcomes.len());
            }
        }
    }
}
