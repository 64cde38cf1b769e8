//! Request dispatch.
//!
//! A [`Dispatch`] picks the pipeline for a request and the path segments the
//! pipeline's decoder can bind to. [`Router`] is the table-based dispatcher:
//! method plus a path template with `{name}` segments.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::Pipeline;
//! use hermes_server::{Dispatch, Router};
//! use http::Method;
//!
//! let pet = Pipeline::builder().wrap(|| hermes_core::Json("rex"));
//!
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/pets/{name}", pet);
//!
//! let matched = router.dispatch(&Method::GET, "/pets/rex").unwrap();
//! assert_eq!(matched.params().get("name"), Some("rex"));
//! assert!(router.dispatch(&Method::DELETE, "/pets/rex").is_none());
//! ```

use std::borrow::Cow;

use hermes_core::{PathParams, Pipeline};
use http::Method;

/// Maps a request to the pipeline that serves it.
///
/// `None` means nothing serves the request and the server answers 404.
pub trait Dispatch: Send + Sync + 'static {
    /// Selects a pipeline for the method and path.
    fn dispatch(&self, method: &Method, path: &str) -> Option<RouteMatch>;
}

/// A selected pipeline with the path segments captured for it.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pipeline: Pipeline,
    params: PathParams,
}

impl RouteMatch {
    /// Creates a match.
    pub fn new(pipeline: Pipeline, params: PathParams) -> Self {
        Self { pipeline, params }
    }

    /// Returns the selected pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the captured path segments.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Splits the match into its parts.
    pub fn into_parts(self) -> (Pipeline, PathParams) {
        (self.pipeline, self.params)
    }
}

/// A single pipeline serves every request.
impl Dispatch for Pipeline {
    fn dispatch(&self, _method: &Method, _path: &str) -> Option<RouteMatch> {
        Some(RouteMatch::new(self.clone(), PathParams::new()))
    }
}

impl<F> Dispatch for F
where
    F: Fn(&Method, &str) -> Option<RouteMatch> + Send + Sync + 'static,
{
    fn dispatch(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self(method, path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    segments: Vec<PathSegment>,
    pipeline: Pipeline,
}

impl Route {
    fn new(method: Method, pattern: &str, pipeline: Pipeline) -> Self {
        Self {
            method,
            segments: parse_segments(pattern),
            pipeline,
        }
    }

    fn match_path(&self, path: &str) -> Option<PathParams> {
        let actual: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if actual.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (pattern, actual) in self.segments.iter().zip(actual) {
            match pattern {
                PathSegment::Literal(expected) => {
                    if expected != actual {
                        return None;
                    }
                }
                PathSegment::Param(name) => params.push(name.clone(), decode_segment(actual)),
            }
        }
        Some(params)
    }
}

fn parse_segments(pattern: &str) -> Vec<PathSegment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => PathSegment::Param(name.to_string()),
            None => PathSegment::Literal(s.to_string()),
        })
        .collect()
}

// Percent-decoded when the escape is valid, raw otherwise.
fn decode_segment(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(Cow::Borrowed(same)) => same.to_string(),
        Ok(Cow::Owned(decoded)) => decoded,
        Err(_) => raw.to_string(),
    }
}

/// Method and path-template dispatcher. Routes are tried in insertion order;
/// the first match wins.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route. `{name}` segments in the pattern capture path
    /// parameters.
    pub fn add_route(&mut self, method: Method, pattern: impl AsRef<str>, pipeline: Pipeline) {
        self.routes.push(Route::new(method, pattern.as_ref(), pipeline));
    }

    /// Chaining form of [`add_route`](Self::add_route).
    #[must_use]
    pub fn route(mut self, method: Method, pattern: impl AsRef<str>, pipeline: Pipeline) -> Self {
        self.add_route(method, pattern, pipeline);
        self
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl Dispatch for Router {
    fn dispatch(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route
                    .match_path(path)
                    .map(|params| RouteMatch::new(route.pipeline.clone(), params))
            })
    }
}
