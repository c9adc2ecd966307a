// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Daemon configuration: TOML loading, defaulting, validation.
pub mod config;
/// Middleware stack for the daemon.
pub mod middleware;

use axum::extract::Path as AxPath;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware as axum_middleware};
use chrono::{DateTime, Utc};
use gantry_endpoint::{AtPathEndpoint, Endpoint, EndpointError, HandlerEndpoint, mount};
use gantry_error::{
    AppEnv, CaughtError, ErrorHandler, ErrorMapperBuilder, HttpError, UnknownError,
};
use gantry_health::{HealthCheck, HealthCheckEndpoint};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// Errors surfaced by daemon routes.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// The requested probe name is not registered.
    #[error("no probe registered under `{0}`")]
    UnknownProbe(String),

    /// A probe ran and failed.
    #[error("probe `{name}` failed: {reason}")]
    ProbeFailed {
        /// Probe name.
        name: String,
        /// Failure message reported by the probe.
        reason: String,
    },
}

/// Map daemon domain errors onto normalized HTTP errors.
pub fn map_daemon_error(raw: &UnknownError) -> Option<HttpError> {
    let err = raw.downcast_ref::<DaemonError>()?;
    Some(match err {
        DaemonError::UnknownProbe(_) => {
            HttpError::not_found(err.to_string()).with_code("PROBE_NOT_FOUND")
        }
        DaemonError::ProbeFailed { .. } => {
            HttpError::bad_gateway(err.to_string()).with_code("PROBE_FAILED")
        }
    })
}

/// Builder pre-wired with the daemon's mapper and a logging listener for
/// errors nothing recognizes.
pub fn error_pipeline(env: AppEnv) -> ErrorMapperBuilder {
    let mut builder = ErrorMapperBuilder::for_env(env);
    builder
        .register_error_mapper(map_daemon_error)
        .on_unknown_error(|raw| error!(error = %raw, "unmapped error reached the boundary"));
    builder
}

// ---------------------------------------------------------------------------
// Application state & routes
// ---------------------------------------------------------------------------

/// Shared application state.
pub struct AppState {
    /// Request-time error boundary.
    pub errors: ErrorHandler,
    /// Health probe registry.
    pub health: Arc<HealthCheck>,
    /// Startup timestamp, reported by `/version` and the uptime probe.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Assemble state, stamping the startup time.
    pub fn new(errors: ErrorHandler, health: Arc<HealthCheck>) -> Self {
        Self {
            errors,
            health,
            started_at: Utc::now(),
        }
    }
}

/// Assemble the daemon router: `/_health`, `/version`, `/probes/{name}`,
/// plus the request-ID and logging middleware.
pub async fn build_app(state: Arc<AppState>) -> Result<Router, EndpointError> {
    let health = AtPathEndpoint::new("/_health", HealthCheckEndpoint::new(state.health.clone()));

    let version_state = state.clone();
    let version = HandlerEndpoint::new(
        "/version",
        get(move || {
            let state = version_state.clone();
            async move { cmd_version(state).await }
        }),
    );

    let probe_state = state.clone();
    let probes = HandlerEndpoint::new(
        "/probes/{name}",
        get(move |AxPath(name): AxPath<String>| {
            let state = probe_state.clone();
            async move { cmd_run_probe(state, name).await }
        }),
    );

    let app = mount(
        Router::new(),
        [&health as &dyn Endpoint, &version, &probes],
    )
    .await?;

    Ok(app
        .layer(axum_middleware::from_fn(middleware::stamp_request_id))
        .layer(axum_middleware::from_fn(middleware::log_requests)))
}

async fn cmd_version(state: Arc<AppState>) -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
    }))
}

async fn cmd_run_probe(state: Arc<AppState>, name: String) -> Response {
    match state.health.run_probe(&name).await {
        Some(Ok(value)) => {
            let mut body = serde_json::Map::new();
            body.insert(name, value);
            (StatusCode::OK, Json(Value::Object(body))).into_response()
        }
        Some(Err(err)) => {
            let caught = CaughtError::from_error(DaemonError::ProbeFailed {
                name,
                reason: err.to_string(),
            });
            state.errors.respond(&caught)
        }
        None => state
            .errors
            .respond(&CaughtError::from_error(DaemonError::UnknownProbe(name))),
    }
}
