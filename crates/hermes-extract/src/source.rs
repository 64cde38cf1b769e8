//! Default request sources.
//!
//! Each function reads one kind of value from a [`Request`]. `Ok(None)` means
//! the value is not present, in which case the decoder leaves the bound field
//! untouched.

use std::borrow::Cow;

use hermes_core::{Document, Request};
use http::header;

use crate::error::{ExtractionError, ExtractionSource};

/// Decodes the body as JSON.
///
/// An empty body yields an empty document.
pub fn json_body(request: &Request) -> Result<Document, ExtractionError> {
    let body = request.body();
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::new());
    }
    serde_json::from_slice(body)
        .map(Document::from_json)
        .map_err(|err| ExtractionError::deserialization_failed(ExtractionSource::Body, err.to_string()))
}

/// Returns the first value of a header. An empty header counts as missing.
pub fn header(request: &Request, name: &str) -> Result<Option<String>, ExtractionError> {
    let Some(value) = request.headers().get(name) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|err| {
        ExtractionError::invalid_value(ExtractionSource::Header, name, err.to_string())
    })?;
    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// Returns a path segment captured by the dispatcher.
pub fn segment(request: &Request, name: &str) -> Result<Option<String>, ExtractionError> {
    Ok(request.segment(name).map(str::to_string))
}

/// Returns every value of a query parameter, percent-decoded.
pub fn queries(request: &Request, name: &str) -> Result<Option<Vec<String>>, ExtractionError> {
    let Some(query) = request.query() else {
        return Ok(None);
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).map_err(|err| {
        ExtractionError::invalid_value(ExtractionSource::Query, name, err.to_string())
    })?;
    let values: Vec<String> = pairs
        .into_iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value)
        .collect();
    Ok((!values.is_empty()).then_some(values))
}

/// Returns a cookie value, path-unescaped when it is validly escaped.
pub fn cookie(request: &Request, name: &str) -> Result<Option<String>, ExtractionError> {
    for value in request.headers().get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        if let Some(raw) = find_cookie(value, name) {
            let unescaped = match urlencoding::decode(raw) {
                Ok(Cow::Borrowed(same)) => same.to_string(),
                Ok(Cow::Owned(decoded)) => decoded,
                Err(_) => raw.to_string(),
            };
            return Ok(Some(unescaped));
        }
    }
    Ok(None)
}

fn find_cookie<'a>(header_value: &'a str, name: &str) -> Option<&'a str> {
    header_value.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}
