//! End-to-end pipeline tests.
//!
//! Each test wires a complete pipeline (pre-checks, main handler and the
//! standard finalizer) and drives a single request through it.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use hermes_core::{
    constructor, standard, Binding, Capabilities, ConstructError, Constructor, Document, Failure,
    Handled, HttpError, Json, LastFailure, Latest, Part, Phase, Pipeline, Request, Resource,
    Response, ResponseWriter, Shared, Source, Value,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ApiKey {
    key: String,
}

hermes_core::value!(ApiKey);

impl Resource for ApiKey {
    fn bindings() -> &'static [Binding] {
        const BINDINGS: &[Binding] = &[Binding::header("key", "x-api-key")];
        BINDINGS
    }
}

#[derive(Debug, Clone, Serialize)]
struct Answer {
    value: u32,
}

hermes_core::value!(Answer => json);

/// Reads header bindings into the target, counting invocations.
fn header_constructor(calls: Arc<AtomicUsize>) -> Constructor {
    constructor(move |_, request, target| {
        calls.fetch_add(1, Ordering::SeqCst);
        let mut document = Document::new();
        for binding in target.bindings() {
            if binding.source == Source::Header {
                if let Some(value) = request.header(binding.key) {
                    document.insert(binding.field, Part::text(value));
                }
            }
        }
        target
            .populate(document)
            .map_err(|err| ConstructError::bad_request(err.to_string()))
    })
}

fn authorize(key: ApiKey) -> Result<(), HttpError> {
    if key.key == "secret" {
        Ok(())
    } else {
        Err(HttpError::unauthorized("Unauthorized."))
    }
}

fn get(uri: &str, key: Option<&str>) -> http::Request<Bytes> {
    let mut builder = http::Request::builder().uri(uri);
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Bytes::new()).unwrap()
}

#[test]
fn test_failing_pre_check_finalizes_with_its_status() {
    let calls = Arc::new(AtomicUsize::new(0));
    let main_calls = Arc::clone(&calls);
    let pipeline = Pipeline::builder()
        .pre_check(authorize)
        .finalizer(standard::respond)
        .wrap(move || {
            main_calls.fetch_add(1, Ordering::SeqCst);
            Answer { value: 42 }
        });

    let response = pipeline.serve(get("/answer", Some("wrong")));

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.body().as_ref(), b"Unauthorized.");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_main_value_is_encoded_as_json() {
    let pipeline = Pipeline::builder()
        .finalizer(standard::respond)
        .wrap(|| -> Result<Answer, HttpError> { Ok(Answer { value: 42 }) });

    let response = pipeline.serve(get("/answer", None));

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"{\"value\":42}\n");
}

#[test]
fn test_resource_constructed_once_per_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::builder()
        .constructor(header_constructor(Arc::clone(&calls)))
        .pre_check(authorize)
        .finalizer(standard::respond)
        .wrap(|key: ApiKey| Json(key.key.len()));

    let response = pipeline.serve(get("/answer", Some("secret")));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"6\n");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    pipeline.serve(get("/answer", Some("secret")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_typed_absent_failure_does_not_short_circuit() {
    let pipeline = Pipeline::builder()
        .pre_check(|| -> Option<HttpError> { None })
        .pre_check(|| -> Result<(), HttpError> { Ok(()) })
        .finalizer(standard::respond)
        .wrap(|| Answer { value: 1 });

    let writer = ResponseWriter::new();
    let phase = pipeline.handle(writer.clone(), Request::from_http(get("/", None)));

    assert_eq!(phase, Phase::MainRan);
    assert_eq!(writer.finish().status(), StatusCode::OK);
}

trait Tag: Send + Sync {
    fn tag(&self) -> &'static str;
}

struct First;
struct Second;

impl Tag for First {
    fn tag(&self) -> &'static str {
        "first"
    }
}

impl Tag for Second {
    fn tag(&self) -> &'static str {
        "second"
    }
}

impl Value for First {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.add::<dyn Tag>(|value| value as Arc<dyn Tag>);
    }
}

impl Value for Second {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.add::<dyn Tag>(|value| value as Arc<dyn Tag>);
    }
}

#[test]
fn test_capability_lookup_prefers_most_recent() {
    let pipeline = Pipeline::builder()
        .pre_check(|| First)
        .pre_check(|| Second)
        .finalizer(standard::respond)
        .wrap(|tag: Latest<dyn Tag>, _: Shared<First>| {
            Json(tag.get().map(|tag| tag.tag()).unwrap_or("none"))
        });

    let response = pipeline.serve(get("/", None));
    assert_eq!(response.body().as_ref(), b"\"second\"\n");
}

#[test]
fn test_handled_keeps_stage_written_response() {
    let pipeline = Pipeline::builder()
        .pre_check(|mut writer: ResponseWriter| -> Result<(), Handled> {
            writer.write_header(StatusCode::CREATED);
            let _ = write!(writer, "HELLO WORLD");
            Err(Handled)
        })
        .finalizer(standard::respond)
        .wrap(|| Answer { value: 0 });

    let response = pipeline.serve(get("/", None));

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.body().as_ref(), b"HELLO WORLD");
}

#[test]
fn test_failed_construction_reaches_finalizer() {
    let failing = constructor(|_, _, _| Err(ConstructError::bad_request("malformed request")));
    let seen = Arc::new(parking_lot::Mutex::new(None));
    let record = Arc::clone(&seen);
    let pipeline = Pipeline::builder()
        .constructor(failing)
        .finalizer(move |failure: LastFailure, response: Response| {
            assert!(response.is_empty());
            *record.lock() = failure.get().map(ToString::to_string);
        })
        .finalizer(standard::respond)
        .wrap(|key: ApiKey| Json(key.key));

    let response = pipeline.serve(get("/", None));

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.body().as_ref(), b"malformed request\n");
    assert_eq!(seen.lock().as_deref(), Some("malformed request"));
}

#[test]
fn test_failed_construction_is_not_repeated_by_later_stages() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let failing = constructor(move |_, _, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Err(ConstructError::bad_request("malformed request"))
    });
    let pipeline = Pipeline::builder()
        .constructor(failing)
        .pre_check(|_: ApiKey| {})
        .finalizer(|_: ApiKey| {})
        .finalizer(standard::respond)
        .wrap(|| Json("unreachable"));

    let response = pipeline.serve(get("/", Some("secret")));

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.body().as_ref(), b"malformed request\n");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_main_failure_rendered_by_finalizer() {
    let pipeline = Pipeline::builder()
        .finalizer(standard::respond)
        .wrap(|| -> Result<Answer, HttpError> { Err(HttpError::not_found("pet not found")) });

    let response = pipeline.serve(get("/pets/rex", None));

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body().as_ref(), b"pet not found");
}

#[test]
fn test_latest_failure_shadows_earlier_failure() {
    let pipeline = Pipeline::builder()
        .pre_check(|| -> (Option<HttpError>, Option<ConstructError>) {
            (Some(HttpError::forbidden("earlier")), None)
        })
        .finalizer(|failure: Latest<dyn Failure>, writer: ResponseWriter| {
            if let Some(failure) = failure.get() {
                writer.write_body(failure.to_string().as_bytes());
            }
        })
        .wrap(|| -> Option<ConstructError> { Some(ConstructError::bad_request("later")) });

    let response = pipeline.serve(get("/", None));
    assert_eq!(response.body().as_ref(), b"later");
}
