// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP-level behavior of the health-check endpoint.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use gantry_endpoint::{AtPathEndpoint, Endpoint};
use gantry_health::{BoxError, HealthCheck, HealthCheckEndpoint, probe_fn};
use http_body_util::BodyExt;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

async fn mounted(check: Arc<HealthCheck>) -> Router {
    AtPathEndpoint::new("/_health", HealthCheckEndpoint::new(check))
        .register(Router::new())
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// 1. No probes – fixed default payload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_with_no_probes_answers_default_payload() {
    let app = mounted(Arc::new(HealthCheck::new())).await;

    let (status, json) = get_json(app, "/_health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"ok": 1}));
}

// ---------------------------------------------------------------------------
// 2. Passing probes – name → value map
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_with_passing_probes_answers_value_map() {
    let check = Arc::new(HealthCheck::new());
    check
        .add_probe("database", probe_fn(|| async { Ok(json!("reachable")) }))
        .add_probe("queue", probe_fn(|| async { Ok(json!({"depth": 0})) }));

    let (status, json) = get_json(mounted(check).await, "/_health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"database": "reachable", "queue": {"depth": 0}}));
}

// ---------------------------------------------------------------------------
// 3. Failing probe – 503 with the failure message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_with_failing_probe_answers_503_and_message() {
    let check = Arc::new(HealthCheck::new());
    check
        .add_probe("database", probe_fn(|| async { Ok(json!("reachable")) }))
        .add_probe(
            "queue",
            probe_fn(|| async { Err(BoxError::from("broker unreachable")) }),
        );

    let (status, json) = get_json(mounted(check).await, "/_health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json, json!({"errorMessage": "broker unreachable"}));
}

// ---------------------------------------------------------------------------
// 4. Probes registered after mounting are observed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn probes_added_after_mounting_are_observed() {
    let check = Arc::new(HealthCheck::new());
    let app = mounted(check.clone()).await;

    let (_, before) = get_json(app.clone(), "/_health").await;
    assert_eq!(before, json!({"ok": 1}));

    check.add_probe("late", probe_fn(|| async { Ok(json!(true)) }));
    let (_, after) = get_json(app, "/_health").await;
    assert_eq!(after, json!({"late": true}));
}

// ---------------------------------------------------------------------------
// 5. Content type
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_content_type_is_json() {
    let app = mounted(Arc::new(HealthCheck::new())).await;

    let response = app
        .oneshot(Request::builder().uri("/_health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let ct = response
        .headers()
        .get("content-type")
        .expect("missing content-type")
        .to_str()
        .unwrap();
    assert!(ct.contains("application/json"), "expected application/json, got: {ct}");
}
