// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use axum::Router;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::http::header::HOST;
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::routing::MethodRouter;
use globset::{Glob, GlobMatcher};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while composing endpoints.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// A virtual-host pattern failed to compile.
    #[error("invalid virtual-host pattern `{pattern}`: {reason}")]
    InvalidHostPattern {
        /// The pattern as given.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// A custom endpoint failed to register its routes.
    #[error("failed to register endpoint: {0}")]
    Registration(String),
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Anything that can register routes onto a router.
///
/// Registration is move-based: the endpoint receives the router, adds its
/// routes, and returns the extended router. Combinators hand children a
/// fresh child router and graft the result onto the parent.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Register this endpoint's routes.
    async fn register(&self, router: Router) -> Result<Router, EndpointError>;
}

#[async_trait]
impl<E: Endpoint + ?Sized> Endpoint for Box<E> {
    async fn register(&self, router: Router) -> Result<Router, EndpointError> {
        (**self).register(router).await
    }
}

#[async_trait]
impl<E: Endpoint + ?Sized> Endpoint for Arc<E> {
    async fn register(&self, router: Router) -> Result<Router, EndpointError> {
        (**self).register(router).await
    }
}

/// Register a sequence of endpoints onto `router`, in order.
pub async fn mount<'a, I>(mut router: Router, endpoints: I) -> Result<Router, EndpointError>
where
    I: IntoIterator<Item = &'a dyn Endpoint>,
{
    for endpoint in endpoints {
        router = endpoint.register(router).await?;
    }
    Ok(router)
}

// ---------------------------------------------------------------------------
// AtPathEndpoint
// ---------------------------------------------------------------------------

/// Mounts a child endpoint under a path prefix.
///
/// The child registers into a fresh router which is then nested under
/// `path`. The path must be non-empty and must not be `/` (axum's nesting
/// rules).
pub struct AtPathEndpoint<E> {
    path: String,
    endpoint: E,
}

impl<E: Endpoint> AtPathEndpoint<E> {
    /// Mount `endpoint` under `path`.
    pub fn new(path: impl Into<String>, endpoint: E) -> Self {
        Self {
            path: path.into(),
            endpoint,
        }
    }
}

#[async_trait]
impl<E: Endpoint> Endpoint for AtPathEndpoint<E> {
    async fn register(&self, router: Router) -> Result<Router, EndpointError> {
        debug!(path = %self.path, "mounting endpoint at path");
        let sub = self.endpoint.register(Router::new()).await?;
        Ok(router.nest(&self.path, sub))
    }
}

// ---------------------------------------------------------------------------
// CollectionEndpoint
// ---------------------------------------------------------------------------

/// Mounts a flat list of endpoints as one unit.
#[derive(Default)]
pub struct CollectionEndpoint {
    endpoints: Vec<Box<dyn Endpoint>>,
}

impl CollectionEndpoint {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection from existing boxed endpoints.
    pub fn from_endpoints(endpoints: Vec<Box<dyn Endpoint>>) -> Self {
        Self { endpoints }
    }

    /// Append an endpoint to the collection.
    pub fn push(mut self, endpoint: impl Endpoint + 'static) -> Self {
        self.endpoints.push(Box::new(endpoint));
        self
    }
}

#[async_trait]
impl Endpoint for CollectionEndpoint {
    async fn register(&self, router: Router) -> Result<Router, EndpointError> {
        let mut sub = Router::new();
        for endpoint in &self.endpoints {
            sub = endpoint.register(sub).await?;
        }
        Ok(router.merge(sub))
    }
}

// ---------------------------------------------------------------------------
// HandlerEndpoint
// ---------------------------------------------------------------------------

/// Lifts a plain axum handler into the endpoint tree.
pub struct HandlerEndpoint {
    path: String,
    handler: MethodRouter,
}

impl HandlerEndpoint {
    /// Serve `handler` at `path`.
    pub fn new(path: impl Into<String>, handler: MethodRouter) -> Self {
        Self {
            path: path.into(),
            handler,
        }
    }
}

#[async_trait]
impl Endpoint for HandlerEndpoint {
    async fn register(&self, router: Router) -> Result<Router, EndpointError> {
        Ok(router.route(&self.path, self.handler.clone()))
    }
}

// ---------------------------------------------------------------------------
// VHostEndpoint
// ---------------------------------------------------------------------------

/// A compiled `Host`-header matcher: exact name or wildcard pattern.
///
/// Matching is case-insensitive and ignores any `:port` suffix.
#[derive(Debug, Clone)]
pub enum HostMatcher {
    /// Exact host name (stored lowercased).
    Exact(String),
    /// Wildcard pattern such as `*.example.com`.
    Pattern(GlobMatcher),
}

impl HostMatcher {
    /// Compile a host expression. Expressions containing `*`, `?`, or `[`
    /// compile to wildcard patterns; anything else matches exactly.
    pub fn parse(host: &str) -> Result<Self, EndpointError> {
        let lowered = host.to_ascii_lowercase();
        if lowered.contains(['*', '?', '[']) {
            let glob = Glob::new(&lowered).map_err(|err| EndpointError::InvalidHostPattern {
                pattern: host.to_owned(),
                reason: err.to_string(),
            })?;
            Ok(Self::Pattern(glob.compile_matcher()))
        } else {
            Ok(Self::Exact(lowered))
        }
    }

    /// Test a `Host` header value against this matcher.
    pub fn matches(&self, host: &str) -> bool {
        let bare = match host.split_once(':') {
            Some((name, _port)) => name,
            None => host,
        };
        let bare = bare.to_ascii_lowercase();
        match self {
            Self::Exact(expected) => *expected == bare,
            Self::Pattern(matcher) => matcher.is_match(&bare),
        }
    }
}

impl fmt::Display for HostMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(host) => f.write_str(host),
            Self::Pattern(matcher) => f.write_str(matcher.glob().glob()),
        }
    }
}

/// Mounts a child endpoint only for requests whose `Host` header matches.
///
/// The child's routes are merged into the parent guarded by a middleware
/// that answers 404 for non-matching hosts. Requests for other hosts do
/// not fall through to sibling routes at the same paths.
pub struct VHostEndpoint<E> {
    matcher: HostMatcher,
    endpoint: E,
}

impl<E: Endpoint> VHostEndpoint<E> {
    /// Mount `endpoint` for requests to `host` (exact or wildcard).
    pub fn new(host: &str, endpoint: E) -> Result<Self, EndpointError> {
        Ok(Self {
            matcher: HostMatcher::parse(host)?,
            endpoint,
        })
    }
}

#[async_trait]
impl<E: Endpoint> Endpoint for VHostEndpoint<E> {
    async fn register(&self, router: Router) -> Result<Router, EndpointError> {
        debug!(vhost = %self.matcher, "mounting vhost");
        let sub = self.endpoint.register(Router::new()).await?;

        let matcher = self.matcher.clone();
        let guard = middleware::from_fn(move |req: Request, next: Next| {
            let matcher = matcher.clone();
            async move {
                let host = req
                    .headers()
                    .get(HOST)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default();
                if matcher.matches(host) {
                    next.run(req).await
                } else {
                    StatusCode::NOT_FOUND.into_response()
                }
            }
        });

        Ok(router.merge(sub.layer(guard)))
    }
}
