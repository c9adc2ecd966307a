// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bridging mapped error outputs into axum responses.

use crate::builder::{ErrorMapperBuilder, Mapper};
use crate::error::CaughtError;
use crate::output::{ErrorOutput, HeaderEntry};
use axum::Json;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Convert an [`ErrorOutput`] into an HTTP response.
///
/// The body is the JSON serialization of the payload alone; the output's
/// `status_code` and `headers` fields shape the envelope and never appear
/// at the top level of the body. Header entries that do not form valid
/// header names or values are skipped.
pub fn output_to_response(output: &ErrorOutput) -> Response {
    let status =
        StatusCode::from_u16(output.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(&output.payload)).into_response();

    let headers = response.headers_mut();
    for (name, entry) in &output.headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        match entry {
            HeaderEntry::One(value) => {
                if let Ok(value) = HeaderValue::from_str(value) {
                    headers.append(name, value);
                }
            }
            HeaderEntry::Many(values) => {
                for value in values {
                    if let Ok(value) = HeaderValue::from_str(value) {
                        headers.append(name.clone(), value);
                    }
                }
            }
            HeaderEntry::Int(value) => {
                headers.append(name, HeaderValue::from(*value));
            }
        }
    }

    response
}

impl IntoResponse for ErrorOutput {
    fn into_response(self) -> Response {
        output_to_response(&self)
    }
}

// ---------------------------------------------------------------------------
// ErrorHandler
// ---------------------------------------------------------------------------

/// Request-time error boundary: maps caught errors and renders the result
/// as an axum [`Response`].
///
/// Construct from a compiled [`Mapper`] or directly from an
/// [`ErrorMapperBuilder`] (which is compiled on conversion). Cheap to
/// clone; share one per application.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    mapper: Mapper,
}

impl ErrorHandler {
    /// Wrap a compiled mapper.
    pub fn new(mapper: Mapper) -> Self {
        Self { mapper }
    }

    /// Map the error and render it as a response.
    pub fn respond(&self, caught: &CaughtError) -> Response {
        output_to_response(&self.mapper.map(caught))
    }

    /// Access the underlying mapper.
    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }
}

impl From<Mapper> for ErrorHandler {
    fn from(mapper: Mapper) -> Self {
        Self::new(mapper)
    }
}

impl From<ErrorMapperBuilder> for ErrorHandler {
    fn from(builder: ErrorMapperBuilder) -> Self {
        Self::new(builder.get())
    }
}
