//! The standard finalizer.
//!
//! [`respond`] renders whatever the request ended with:
//!
//! 1. the latest failure, using its own rendering if it is a structured
//!    response, or `500` with its message otherwise
//! 2. the response value, using its own rendering if it is a structured
//!    response
//! 3. the response value encoded as compact JSON (`null` when there is none)
//!
//! A response value with neither capability is answered with `500`.

use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;

use crate::param::{LastFailure, Response};
use crate::response::{Encode, StructuredResponse, APPLICATION_JSON, TEXT_PLAIN};
use crate::transport::ResponseWriter;

/// Writes the outcome of a request to the transport.
pub fn respond(writer: ResponseWriter, response: Response, failure: LastFailure) {
    if let Some(err) = failure.get() {
        match failure.view::<dyn StructuredResponse>() {
            Some(structured) => write_structured(&writer, structured.as_ref()),
            None => write_text(&writer, StatusCode::INTERNAL_SERVER_ERROR, &format!("{err}\n")),
        }
        return;
    }

    let Some(entry) = response.entry() else {
        write_json(&writer, None);
        return;
    };

    if let Some(structured) = entry.view::<dyn StructuredResponse>() {
        write_structured(&writer, structured.as_ref());
    } else if let Some(encode) = entry.view::<dyn Encode>() {
        write_json(&writer, Some(encode));
    } else {
        tracing::warn!(type_name = entry.type_name(), "response has no encoding");
        write_text(
            &writer,
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("no encoding for response of type {}\n", entry.type_name()),
        );
    }
}

fn write_structured(writer: &ResponseWriter, structured: &dyn StructuredResponse) {
    let mut body = Vec::new();
    if let Err(err) = structured.write_body(&mut body) {
        tracing::warn!(error = %err, "failed to render response body");
    }
    if let Some(content_type) = structured.content_type() {
        writer.insert_header(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    if let Some(status) = structured.status() {
        writer.write_header(status);
    }
    if !body.is_empty() {
        writer.write_body(&body);
    }
}

fn write_json(writer: &ResponseWriter, encode: Option<Arc<dyn Encode>>) {
    let mut body = Vec::new();
    let encoded = match encode {
        Some(encode) => encode.encode(&mut body),
        None => serde_json::to_writer(&mut body, &serde_json::Value::Null),
    };

    match encoded {
        Ok(()) => {
            body.push(b'\n');
            writer.insert_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
            writer.write_header(StatusCode::OK);
            writer.write_body(&body);
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode response");
            write_text(
                writer,
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to encode response\n",
            );
        }
    }
}

fn write_text(writer: &ResponseWriter, status: StatusCode, body: &str) {
    writer.insert_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    writer.write_header(status);
    writer.write_body(body.as_bytes());
}
