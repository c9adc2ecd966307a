// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP exposure of a [`HealthCheck`].

use crate::check::HealthCheck;
use async_trait::async_trait;
use axum::{Json, Router, routing::get};
use gantry_endpoint::{Endpoint, EndpointError};
use std::sync::Arc;

/// Serves a [`HealthCheck`] verdict at the root of wherever it is mounted.
///
/// Mount under a prefix to get the conventional path:
///
/// ```rust,no_run
/// use gantry_endpoint::{AtPathEndpoint, Endpoint};
/// use gantry_health::{HealthCheck, HealthCheckEndpoint};
/// use std::sync::Arc;
///
/// # async fn demo() -> Result<(), gantry_endpoint::EndpointError> {
/// let check = Arc::new(HealthCheck::new());
/// let endpoint = AtPathEndpoint::new("/_health", HealthCheckEndpoint::new(check));
/// let app = endpoint.register(axum::Router::new()).await?;
/// # let _ = app; Ok(())
/// # }
/// ```
pub struct HealthCheckEndpoint {
    check: Arc<HealthCheck>,
}

impl HealthCheckEndpoint {
    /// Expose the given check.
    pub fn new(check: Arc<HealthCheck>) -> Self {
        Self { check }
    }

    /// The underlying check (e.g. to register probes after mounting).
    pub fn check(&self) -> &Arc<HealthCheck> {
        &self.check
    }
}

#[async_trait]
impl Endpoint for HealthCheckEndpoint {
    async fn register(&self, router: Router) -> Result<Router, EndpointError> {
        let check = self.check.clone();
        let handler = move || {
            let check = check.clone();
            async move {
                let (status, body) = check.respond().await;
                (status, Json(body))
            }
        };
        Ok(router.route("/", get(handler)))
    }
}
