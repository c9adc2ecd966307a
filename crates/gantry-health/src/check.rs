// SPDX-License-Identifier: MIT OR Apache-2.0
//! Probe registry and short-circuiting aggregation.

use crate::probe::{Probe, ProbeResult};
use axum::http::StatusCode;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Response shaping for [`HealthCheck`].
#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheckOptions {
    /// Status answered when every probe passes (or none are registered).
    pub healthy_status_code: StatusCode,
    /// Status answered when a probe fails.
    pub unhealthy_status_code: StatusCode,
    /// Body answered when no probes are registered.
    pub default_response: Value,
}

impl Default for HealthCheckOptions {
    fn default() -> Self {
        Self {
            healthy_status_code: StatusCode::OK,
            unhealthy_status_code: StatusCode::SERVICE_UNAVAILABLE,
            default_response: json!({"ok": 1}),
        }
    }
}

// ---------------------------------------------------------------------------
// ProbeReport
// ---------------------------------------------------------------------------

/// Aggregate verdict of one evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeReport {
    /// Every probe passed; values keyed by probe name.
    Healthy(serde_json::Map<String, Value>),
    /// The first failing probe's message. Probes after it were not run.
    Unhealthy(String),
}

// ---------------------------------------------------------------------------
// HealthCheck
// ---------------------------------------------------------------------------

/// Ordered registry of named probes with short-circuiting aggregation.
///
/// Probes execute strictly sequentially in registration order; the first
/// failure stops the run and later probes are not invoked. Re-registering
/// a name replaces the probe in place, keeping its original execution
/// position. The registry may grow while the server is running; each
/// evaluation observes a consistent snapshot taken at its start.
pub struct HealthCheck {
    probes: Mutex<Vec<(String, Arc<dyn Probe>)>>,
    options: HealthCheckOptions,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthCheck {
    /// Create a check with default options (200 / 503 / `{"ok": 1}`).
    pub fn new() -> Self {
        Self::with_options(HealthCheckOptions::default())
    }

    /// Create a check with explicit response options.
    pub fn with_options(options: HealthCheckOptions) -> Self {
        Self {
            probes: Mutex::new(Vec::new()),
            options,
        }
    }

    /// The configured response options.
    pub fn options(&self) -> &HealthCheckOptions {
        &self.options
    }

    /// Register a probe under `name`, replacing any existing probe with
    /// that name in place.
    pub fn add_probe(&self, name: impl Into<String>, probe: impl Probe + 'static) -> &Self {
        let name = name.into();
        let probe: Arc<dyn Probe> = Arc::new(probe);
        let mut guard = self.probes.lock().expect("probe registry lock poisoned");
        match guard.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = probe,
            None => guard.push((name, probe)),
        }
        self
    }

    /// Registered probe names, in execution order.
    pub fn probe_names(&self) -> Vec<String> {
        self.probes
            .lock()
            .expect("probe registry lock poisoned")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns `true` when no probes are registered.
    pub fn is_empty(&self) -> bool {
        self.probes
            .lock()
            .expect("probe registry lock poisoned")
            .is_empty()
    }

    fn snapshot(&self) -> Vec<(String, Arc<dyn Probe>)> {
        self.probes
            .lock()
            .expect("probe registry lock poisoned")
            .clone()
    }

    /// Run one aggregation pass over the registered probes.
    ///
    /// An empty registry reports healthy with an empty value map; callers
    /// wanting the configured default body should use
    /// [`respond`](Self::respond), which answers it without aggregating.
    pub async fn run(&self) -> ProbeReport {
        let mut values = serde_json::Map::new();
        for (name, probe) in self.snapshot() {
            match probe.check().await {
                Ok(value) => {
                    values.insert(name, value);
                }
                Err(err) => return ProbeReport::Unhealthy(err.to_string()),
            }
        }
        ProbeReport::Healthy(values)
    }

    /// Run a single probe by name. Returns `None` for an unknown name.
    pub async fn run_probe(&self, name: &str) -> Option<ProbeResult> {
        let probe = self
            .probes
            .lock()
            .expect("probe registry lock poisoned")
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, probe)| probe.clone())?;
        Some(probe.check().await)
    }

    /// Evaluate and shape the HTTP answer: status code plus JSON body.
    pub async fn respond(&self) -> (StatusCode, Value) {
        if self.is_empty() {
            return (
                self.options.healthy_status_code,
                self.options.default_response.clone(),
            );
        }
        match self.run().await {
            ProbeReport::Healthy(values) => {
                (self.options.healthy_status_code, Value::Object(values))
            }
            ProbeReport::Unhealthy(message) => (
                self.options.unhealthy_status_code,
                json!({"errorMessage": message}),
            ),
        }
    }
}
