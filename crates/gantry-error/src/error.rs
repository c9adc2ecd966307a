// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error values flowing through the mapping pipeline.

use crate::output::{ErrorOutput, HeaderEntry};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt;

/// Boxed error type accepted at the pipeline boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ---------------------------------------------------------------------------
// AppEnv
// ---------------------------------------------------------------------------

/// Deployment-environment classification.
///
/// Passed explicitly to [`ErrorMapperBuilder::for_env`]; there is no
/// process-global environment flag. Development and test configurations
/// expose stack traces and real internal-error messages; production hides
/// both.
///
/// [`ErrorMapperBuilder::for_env`]: crate::ErrorMapperBuilder::for_env
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEnv {
    /// Local development.
    #[default]
    Development,
    /// Automated test runs.
    Test,
    /// Production deployment.
    Production,
}

impl AppEnv {
    /// Returns `true` for [`AppEnv::Production`].
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for AppEnv {
    type Err = UnknownAppEnv;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(UnknownAppEnv(other.to_owned())),
        }
    }
}

/// The string did not name a known deployment environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application environment `{0}` (expected development, test, or production)")]
pub struct UnknownAppEnv(pub String);

// ---------------------------------------------------------------------------
// HttpError
// ---------------------------------------------------------------------------

/// The status code is outside the valid 100–599 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid HTTP status code {0}")]
pub struct InvalidStatusCode(pub u16);

/// A normalized error: an error enriched with an HTTP status code and an
/// optional machine-readable code.
///
/// This is the canonical intermediate representation between a caught error
/// and its wire output. An error already in this form passes through the
/// mapper chain untouched.
#[derive(Debug, Clone)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    code: Option<String>,
    headers: BTreeMap<String, HeaderEntry>,
    stack: Option<String>,
}

impl HttpError {
    /// Create a normalized error with the given status and message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
            headers: BTreeMap::new(),
            stack: None,
        }
    }

    /// Create a normalized error from a raw status code, validating the
    /// 100–599 range.
    pub fn from_u16(status: u16, message: impl Into<String>) -> Result<Self, InvalidStatusCode> {
        let status = StatusCode::from_u16(status).map_err(|_| InvalidStatusCode(status))?;
        Ok(Self::new(status, message))
    }

    /// 400 — the request was malformed or invalid.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 — missing or invalid credentials.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 403 — the caller may not perform this operation.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// 404 — resource not found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 409 — conflicting state.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// 502 — an upstream dependency failed.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    /// 500 — unexpected internal error. This is the synthesized fallback for
    /// errors no mapper recognizes; the message is carried into the payload
    /// (redaction, when configured, happens in the transformer chain).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attach a machine-readable code, surfaced as `payload.code`.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a response header carried into the output.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderEntry>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a stack trace string.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Machine-readable code, if any.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Stack trace, if one was attached.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Headers carried by this error.
    pub fn headers(&self) -> &BTreeMap<String, HeaderEntry> {
        &self.headers
    }

    /// Derive the default wire output for this error: its status, its
    /// headers, and the payload `{statusCode, error, message}`.
    pub fn to_output(&self) -> ErrorOutput {
        let mut payload = serde_json::Map::new();
        payload.insert("statusCode".into(), json!(self.status.as_u16()));
        payload.insert(
            "error".into(),
            json!(self.status.canonical_reason().unwrap_or("Unknown")),
        );
        payload.insert("message".into(), json!(self.message));
        ErrorOutput {
            status_code: self.status.as_u16(),
            headers: self.headers.clone(),
            payload,
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for HttpError {}

// ---------------------------------------------------------------------------
// UnknownError
// ---------------------------------------------------------------------------

/// An arbitrary error entering the pipeline in unrecognized form.
///
/// Wraps the original error (downcastable for mappers) together with an
/// optional captured stack trace and an optional machine code. Rust errors
/// carry no ambient stack string, so one is recorded only when the catch
/// site supplies it via [`with_stack`](Self::with_stack) or
/// [`captured`](Self::captured).
#[derive(Debug)]
pub struct UnknownError {
    inner: BoxError,
    stack: Option<String>,
    code: Option<String>,
}

impl UnknownError {
    /// Wrap an error without capturing a stack trace.
    pub fn new(inner: impl Into<BoxError>) -> Self {
        Self {
            inner: inner.into(),
            stack: None,
            code: None,
        }
    }

    /// Wrap an error, capturing a backtrace of the current call site.
    pub fn captured(inner: impl Into<BoxError>) -> Self {
        Self::new(inner).with_stack(Backtrace::force_capture().to_string())
    }

    /// Attach a stack trace string.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attach a machine-readable code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Human-readable message (the wrapped error's `Display`).
    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    /// Captured stack trace, if any.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Machine-readable code, if any.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Attempt to downcast the wrapped error to a concrete type.
    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl fmt::Display for UnknownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl std::error::Error for UnknownError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

// ---------------------------------------------------------------------------
// CaughtError
// ---------------------------------------------------------------------------

/// Any error caught at the HTTP boundary, tagged by whether it is already
/// normalized.
///
/// The tag replaces structural sniffing: "is this error already normalized"
/// is a variant test, not a property probe.
#[derive(Debug)]
pub enum CaughtError {
    /// Already normalized; used as-is by the mapper.
    Http(HttpError),
    /// Unrecognized; runs through the mapper chain.
    Unknown(UnknownError),
}

impl CaughtError {
    /// Wrap an arbitrary error as unrecognized.
    pub fn from_error(inner: impl Into<BoxError>) -> Self {
        Self::Unknown(UnknownError::new(inner))
    }

    /// Wrap an arbitrary error as unrecognized, capturing a backtrace.
    pub fn captured(inner: impl Into<BoxError>) -> Self {
        Self::Unknown(UnknownError::captured(inner))
    }

    /// Human-readable message of the underlying error.
    pub fn message(&self) -> String {
        match self {
            Self::Http(err) => err.message().to_owned(),
            Self::Unknown(err) => err.message(),
        }
    }

    /// Stack trace of the underlying error, if one is present.
    pub fn stack(&self) -> Option<&str> {
        match self {
            Self::Http(err) => err.stack(),
            Self::Unknown(err) => err.stack(),
        }
    }

    /// Machine-readable code of the underlying error, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Http(err) => err.code(),
            Self::Unknown(err) => err.code(),
        }
    }
}

impl From<HttpError> for CaughtError {
    fn from(err: HttpError) -> Self {
        Self::Http(err)
    }
}

impl From<UnknownError> for CaughtError {
    fn from(err: UnknownError) -> Self {
        Self::Unknown(err)
    }
}

impl From<BoxError> for CaughtError {
    fn from(err: BoxError) -> Self {
        Self::from_error(err)
    }
}
