//! The request decoder.

use std::fmt;
use std::sync::Arc;

use hermes_core::{constructor, Constructor, ConstructError, Document, Part, Request, Source, Target};
use http::header;

use crate::error::{ExtractionError, ExtractionSource};
use crate::source;

/// Decodes the request body into a document.
pub type BodyFn = Arc<dyn Fn(&Request) -> Result<Document, ExtractionError> + Send + Sync>;

/// Reads a single named value from the request.
pub type ValueFn =
    Arc<dyn Fn(&Request, &str) -> Result<Option<String>, ExtractionError> + Send + Sync>;

/// Reads every value of a named parameter from the request.
pub type ValuesFn =
    Arc<dyn Fn(&Request, &str) -> Result<Option<Vec<String>>, ExtractionError> + Send + Sync>;

/// Decodes requests into [`Target`]s.
///
/// The body is decoded first; fields bound to headers, path segments, query
/// parameters or cookies are then read and override body fields of the same
/// name. A bound value that is not present leaves the field untouched.
///
/// Every source is replaceable:
///
/// ```rust
/// use hermes_extract::Decoder;
///
/// let decoder = Decoder::standard()
///     .with_segment(|request, name| {
///         Ok(request.path().rsplit('/').next().filter(|_| name == "id").map(str::to_string))
///     })
///     .require_json(true);
/// # let _ = decoder;
/// ```
#[derive(Clone)]
pub struct Decoder {
    body: BodyFn,
    header: ValueFn,
    segment: ValueFn,
    queries: ValuesFn,
    cookie: ValueFn,
    require_json: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::standard()
    }
}

impl Decoder {
    /// Creates the standard decoder: JSON body, first header value, segments
    /// captured by the dispatcher, percent-decoded queries and path-unescaped
    /// cookies.
    pub fn standard() -> Self {
        Self {
            body: Arc::new(source::json_body),
            header: Arc::new(source::header),
            segment: Arc::new(source::segment),
            queries: Arc::new(source::queries),
            cookie: Arc::new(source::cookie),
            require_json: false,
        }
    }

    /// Replaces the body decoder.
    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&Request) -> Result<Document, ExtractionError> + Send + Sync + 'static,
    {
        self.body = Arc::new(body);
        self
    }

    /// Replaces the header source.
    pub fn with_header<F>(mut self, header: F) -> Self
    where
        F: Fn(&Request, &str) -> Result<Option<String>, ExtractionError> + Send + Sync + 'static,
    {
        self.header = Arc::new(header);
        self
    }

    /// Replaces the path segment source.
    pub fn with_segment<F>(mut self, segment: F) -> Self
    where
        F: Fn(&Request, &str) -> Result<Option<String>, ExtractionError> + Send + Sync + 'static,
    {
        self.segment = Arc::new(segment);
        self
    }

    /// Replaces the query source.
    pub fn with_queries<F>(mut self, queries: F) -> Self
    where
        F: Fn(&Request, &str) -> Result<Option<Vec<String>>, ExtractionError>
            + Send
            + Sync
            + 'static,
    {
        self.queries = Arc::new(queries);
        self
    }

    /// Replaces the cookie source.
    pub fn with_cookie<F>(mut self, cookie: F) -> Self
    where
        F: Fn(&Request, &str) -> Result<Option<String>, ExtractionError> + Send + Sync + 'static,
    {
        self.cookie = Arc::new(cookie);
        self
    }

    /// Rejects non-empty bodies whose content type is not JSON.
    pub fn require_json(mut self, require: bool) -> Self {
        self.require_json = require;
        self
    }

    /// Decodes the request into the target.
    pub fn decode(&self, request: &Request, target: &mut dyn Target) -> Result<(), ExtractionError> {
        if self.require_json && !request.body().is_empty() {
            check_content_type(request)?;
        }

        let mut document = (self.body)(request)?;
        for binding in target.bindings() {
            let source = ExtractionSource::from(binding.source);
            let values = match binding.source {
                Source::Header => (self.header)(request, binding.key)?.map(|value| vec![value]),
                Source::Segment => (self.segment)(request, binding.key)?.map(|value| vec![value]),
                Source::Cookie => (self.cookie)(request, binding.key)?.map(|value| vec![value]),
                Source::Query => (self.queries)(request, binding.key)?,
            };
            let Some(values) = values else {
                tracing::trace!(%source, key = binding.key, "bound value not found");
                continue;
            };

            let part = if binding.repeated {
                Part::repeated(values)
            } else if values.len() == 1 {
                Part::text(values.into_iter().next().unwrap_or_default())
            } else {
                return Err(ExtractionError::ambiguous(source, binding.key, values.len()));
            };
            document.insert(binding.field, part);
        }

        let type_name = target.descriptor().name();
        target.populate(document).map_err(|err| {
            tracing::debug!(type_name, error = %err, "failed to decode request");
            ExtractionError::deserialization_failed(ExtractionSource::Body, err.to_string())
        })
    }

    /// Adapts the decoder to the fallback constructor contract.
    pub fn into_constructor(self) -> Constructor {
        constructor(move |_writer, request, target| {
            self.decode(request, target).map_err(ConstructError::from)
        })
    }
}

fn check_content_type(request: &Request) -> Result<(), ExtractionError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let is_json = content_type.is_some_and(|value| {
        let essence = value.split(';').next().unwrap_or_default().trim();
        essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
    });
    if is_json {
        Ok(())
    } else {
        Err(ExtractionError::unsupported_media_type("application/json", content_type))
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("require_json", &self.require_json)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hermes_core::{Binding, Entry, PathParams, Resource};
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct Filter {
        categories: Vec<String>,
        #[serde(rename = "hasPhotos")]
        has_photos: Option<bool>,
        limit: u32,
        name: String,
    }

    hermes_core::value!(Filter);

    impl Resource for Filter {
        fn bindings() -> &'static [Binding] {
            const BINDINGS: &[Binding] = &[
                Binding::query_all("categories", "categories"),
                Binding::query("hasPhotos", "hasPhotos"),
                Binding::header("limit", "x-limit"),
                Binding::segment("name", "name"),
            ];
            BINDINGS
        }
    }

    fn request(uri: &str, body: &str) -> Request {
        let request = http::Request::builder()
            .uri(uri)
            .header("x-limit", "25")
            .body(Bytes::from(body.to_string()))
            .unwrap();
        let params: PathParams = [("name", "rex")].into_iter().collect();
        Request::from_http(request).with_segments(params)
    }

    fn decode(decoder: &Decoder, request: &Request) -> Result<Filter, ExtractionError> {
        let mut target: Box<dyn Target> = Box::new(Filter::default());
        decoder.decode(request, target.as_mut())?;
        let entry: Entry = target.into_entry();
        Ok(entry.downcast::<Filter>().map(|filter| Filter::clone(&filter)).unwrap_or_default())
    }

    #[test]
    fn test_bindings_from_every_source() {
        let req = request("/pets/rex?categories=dog&categories=cat&hasPhotos=true", "");
        let filter = decode(&Decoder::standard(), &req).unwrap();

        assert_eq!(filter.categories, ["dog", "cat"]);
        assert_eq!(filter.has_photos, Some(true));
        assert_eq!(filter.limit, 25);
        assert_eq!(filter.name, "rex");
    }

    #[test]
    fn test_single_repeated_value_is_a_sequence() {
        let req = request("/pets?categories=dog", "");
        let filter = decode(&Decoder::standard(), &req).unwrap();
        assert_eq!(filter.categories, ["dog"]);
        assert_eq!(filter.has_photos, None);
    }

    #[test]
    fn test_multiple_values_for_single_binding() {
        let req = request("/pets?hasPhotos=true&hasPhotos=false", "");
        let err = decode(&Decoder::standard(), &req).unwrap_err();
        assert_eq!(err.field(), Some("hasPhotos"));
    }

    #[test]
    fn test_bindings_override_body() {
        let req = request("/pets", r#"{"limit": 3, "name": "ignored", "categories": ["x"]}"#);
        let filter = decode(&Decoder::standard(), &req).unwrap();
        assert_eq!(filter.limit, 25);
        assert_eq!(filter.name, "rex");
        assert_eq!(filter.categories, ["x"]);
    }

    #[test]
    fn test_uncoercible_value_fails() {
        let req = request("/pets?hasPhotos=maybe", "");
        let err = decode(&Decoder::standard(), &req).unwrap_err();
        assert_eq!(err.extraction_source(), ExtractionSource::Body);
    }

    #[test]
    fn test_require_json_content_type() {
        let decoder = Decoder::standard().require_json(true);
        let err = decode(&decoder, &request("/pets", "{}")).unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);

        assert!(decode(&decoder, &request("/pets", "")).is_ok());
    }

    #[test]
    fn test_custom_source() {
        let decoder = Decoder::standard().with_header(|_, _| Ok(Some("7".to_string())));
        let filter = decode(&decoder, &request("/pets", "")).unwrap();
        assert_eq!(filter.limit, 7);
    }

    #[test]
    fn test_constructor_maps_errors() {
        let construct = Decoder::standard().into_constructor();
        let req = request("/pets", "{broken");
        let mut target: Box<dyn Target> = Box::new(Filter::default());
        let err = construct(&hermes_core::ResponseWriter::new(), &req, target.as_mut()).unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }
}
