// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Probe registry and short-circuiting aggregation.
pub mod check;
/// HTTP exposure of a health check.
pub mod endpoint;
/// The probe contract.
pub mod probe;

pub use check::{HealthCheck, HealthCheckOptions, ProbeReport};
pub use endpoint::HealthCheckEndpoint;
pub use probe::{BoxError, FnProbe, Probe, ProbeResult, probe_fn};
