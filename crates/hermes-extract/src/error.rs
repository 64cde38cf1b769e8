//! Why a request could not be decoded.

use std::fmt;

use hermes_core::{ConstructError, Source};
use http::StatusCode;
use thiserror::Error;

/// The part of the request being read when decoding failed.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    Body,
    Header,
    Segment,
    Query,
    Cookie,
    /// The `Content-Type` header, checked before the body is parsed.
    ContentType,
}

impl ExtractionSource {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Header => "header",
            Self::Segment => "segment",
            Self::Query => "query",
            Self::Cookie => "cookie",
            Self::ContentType => "content-type",
        }
    }
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Source> for ExtractionSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Header => Self::Header,
            Source::Query => Self::Query,
            Source::Segment => Self::Segment,
            Source::Cookie => Self::Cookie,
        }
    }
}

/// A decoding failure. Maps to 400, or 415 for a rejected content type.
///
/// ```rust
/// use hermes_extract::{ExtractionError, ExtractionSource};
/// use http::StatusCode;
///
/// let err = ExtractionError::ambiguous(ExtractionSource::Query, "limit", 2);
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.extraction_source(), ExtractionSource::Query);
/// assert_eq!(err.to_string(), "expected one query value for 'limit', got 2");
/// ```
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// A raw value exists but cannot be read (bad escape, non-ASCII header).
    #[error("invalid {from} value '{field}': {details}")]
    InvalidValue {
        from: ExtractionSource,
        field: String,
        details: String,
    },

    /// A single-valued binding saw the key more than once.
    #[error("expected one {from} value for '{field}', got {count}")]
    Ambiguous {
        from: ExtractionSource,
        field: String,
        count: usize,
    },

    /// The collected document did not deserialize into the resource.
    #[error("failed to deserialize {from}: {details}")]
    Deserialize { from: ExtractionSource, details: String },

    #[error("unsupported content type: expected '{expected}', got '{}'", .actual.as_deref().unwrap_or("none"))]
    UnsupportedMediaType {
        expected: String,
        actual: Option<String>,
    },
}

impl ExtractionError {
    /// A value that exists but cannot be read.
    #[must_use]
    pub fn invalid_value(
        from: ExtractionSource,
        field: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            from,
            field: field.into(),
            details: details.into(),
        }
    }

    /// A single-valued binding that saw `count` values.
    #[must_use]
    pub fn ambiguous(from: ExtractionSource, field: impl Into<String>, count: usize) -> Self {
        Self::Ambiguous {
            from,
            field: field.into(),
            count,
        }
    }

    /// A document that does not fit the target type.
    #[must_use]
    pub fn deserialization_failed(from: ExtractionSource, details: impl Into<String>) -> Self {
        Self::Deserialize {
            from,
            details: details.into(),
        }
    }

    /// A body whose content type is not `expected`.
    #[must_use]
    pub fn unsupported_media_type(expected: &str, actual: Option<&str>) -> Self {
        Self::UnsupportedMediaType {
            expected: expected.to_string(),
            actual: actual.map(str::to_string),
        }
    }

    /// Where the failing value came from.
    #[must_use]
    pub fn extraction_source(&self) -> ExtractionSource {
        match self {
            Self::InvalidValue { from, .. }
            | Self::Ambiguous { from, .. }
            | Self::Deserialize { from, .. } => *from,
            Self::UnsupportedMediaType { .. } => ExtractionSource::ContentType,
        }
    }

    /// The request key involved, for per-key failures.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { field, .. } | Self::Ambiguous { field, .. } => Some(field),
            Self::Deserialize { .. } | Self::UnsupportedMediaType { .. } => None,
        }
    }

    /// HTTP status for the error response.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if matches!(self, Self::UnsupportedMediaType { .. }) {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}

impl From<ExtractionError> for ConstructError {
    fn from(err: ExtractionError) -> Self {
        Self::new(err.status_code(), err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn per_key_errors_name_the_key() {
        let err = ExtractionError::invalid_value(ExtractionSource::Query, "name", "bad escape");
        assert_eq!(err.field(), Some("name"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "invalid query value 'name': bad escape");

        let err = ExtractionError::ambiguous(ExtractionSource::Query, "hasPhotos", 3);
        assert_eq!(err.field(), Some("hasPhotos"));
        assert_eq!(err.to_string(), "expected one query value for 'hasPhotos', got 3");
    }

    #[test]
    fn media_type_is_415() {
        let err = ExtractionError::unsupported_media_type("application/json", Some("text/plain"));
        assert_eq!(err.extraction_source(), ExtractionSource::ContentType);
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(err.to_string().ends_with("got 'text/plain'"));

        let missing = ExtractionError::unsupported_media_type("application/json", None);
        assert!(missing.to_string().ends_with("got 'none'"));
        assert_eq!(missing.field(), None);
    }

    #[test]
    fn construct_error_keeps_status_and_source() {
        let err = ExtractionError::deserialization_failed(ExtractionSource::Body, "EOF");
        let construct = ConstructError::from(err);

        assert_eq!(construct.status(), StatusCode::BAD_REQUEST);
        assert_eq!(construct.message(), "failed to deserialize body: EOF");
        assert!(construct.source().is_some());
    }

    #[test]
    fn source_names() {
        assert_eq!(ExtractionSource::Segment.to_string(), "segment");
        assert_eq!(ExtractionSource::ContentType.to_string(), "content-type");
    }
}
