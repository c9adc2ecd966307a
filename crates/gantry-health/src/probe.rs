// SPDX-License-Identifier: MIT OR Apache-2.0
//! The probe contract.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// Boxed error type a probe may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a single probe invocation.
pub type ProbeResult = Result<Value, BoxError>;

/// A named asynchronous health check.
///
/// A probe either resolves with an arbitrary JSON value (reported under
/// the probe's name in the aggregate) or fails with an error whose message
/// becomes the aggregate failure. No timeout is imposed here; a probe that
/// never resolves stalls the whole health check, so bound it externally if
/// that matters.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run the check once.
    async fn check(&self) -> ProbeResult;
}

/// A [`Probe`] backed by a closure returning a future.
pub struct FnProbe<F>(F);

/// Lift an async closure into a [`Probe`].
pub fn probe_fn<F, Fut>(f: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ProbeResult> + Send,
{
    FnProbe(f)
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ProbeResult> + Send,
{
    async fn check(&self) -> ProbeResult {
        (self.0)().await
    }
}
