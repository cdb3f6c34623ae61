//! HTTP API tests driven through the router without a socket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use twemproxy_sync::http::build_router;
use twemproxy_sync::proxy::ProcessId;
use twemproxy_sync::sync::{SyncPhase, Synchronizer};

mod common;

use common::{settings, FakeProxy};

fn router(dir: &std::path::Path) -> (Router, Arc<Synchronizer<FakeProxy>>) {
    let sync = Arc::new(Synchronizer::new(settings(dir), FakeProxy::default()));
    (build_router(sync.clone()), sync)
}

fn snapshot(host: &str) -> Value {
    json!({
        "/cache": {
            "name": "/cache",
            "ports": [6379],
            "labels": {
                "twemproxy_pool": "cache",
                "twemproxy_redis": "true"
            },
            "tasks": [
                { "id": "t1", "host": host, "ports": [31000] }
            ]
        }
    })
}

fn put_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::PUT)
        .uri("/v1/state")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_put_state_reports_change() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = router(dir.path());

    let (status, body) = send(&router, Method::PUT, "/v1/state", Some(snapshot("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "changed": true }));

    let (status, body) = send(&router, Method::PUT, "/v1/state", Some(snapshot("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "changed": false }));

    let (status, body) = send(&router, Method::PUT, "/v1/state", Some(snapshot("10.0.0.6"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "changed": true }));
}

#[tokio::test]
async fn test_invalid_config_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let (router, sync) = router(dir.path());
    sync.proxy().fail_validate(true);

    let (status, body) = send(&router, Method::PUT, "/v1/state", Some(snapshot("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("invalid"));
}

#[tokio::test]
async fn test_write_failure_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let (router, sync) = router(dir.path());
    sync.proxy().fail_write(true);

    let (status, _) = send(&router, Method::PUT, "/v1/state", Some(snapshot("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_start_failure_is_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let (router, sync) = router(dir.path());
    sync.proxy().fail_start(true);

    let (status, _) = send(&router, Method::PUT, "/v1/state", Some(snapshot("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_malformed_snapshot_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (router, sync) = router(dir.path());

    let (status, _) = send(&router, Method::PUT, "/v1/state", Some(json!(["not", "a", "map"]))).await;
    assert!(status.is_client_error());
    assert!(sync.proxy().calls().is_empty());
}

#[tokio::test]
async fn test_pools_not_found_before_first_apply() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = router(dir.path());

    let (status, _) = send(&router, Method::GET, "/v1/pools", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&router, Method::PUT, "/v1/state", Some(snapshot("10.0.0.5"))).await;

    let (status, body) = send(&router, Method::GET, "/v1/pools", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache"]["listen"], "127.0.0.1:6379");
    assert_eq!(body["cache"]["redis"], true);
    assert_eq!(body["cache"]["servers"], json!(["10.0.0.5:31000:1 t1"]));
}

#[tokio::test]
async fn test_status_tracks_applied_state() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = router(dir.path());

    let (status, body) = send(&router, Method::GET, "/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["pid"], Value::Null);
    assert_eq!(body["pools"], 0);

    send(&router, Method::PUT, "/v1/state", Some(snapshot("10.0.0.5"))).await;

    let (_, body) = send(&router, Method::GET, "/v1/status", None).await;
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["pid"], 100);
    assert_eq!(body["pools"], 1);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_update_outlives_dropped_request() {
    let dir = tempfile::tempdir().unwrap();
    let sync = Arc::new(Synchronizer::new(
        settings(dir.path()),
        FakeProxy::with_validate_delay(Duration::from_millis(300)),
    ));
    let router = build_router(sync.clone());

    // Give up on the response while validation is still running.
    let dropped = tokio::time::timeout(
        Duration::from_millis(50),
        router.oneshot(put_request(snapshot("10.0.0.5"))),
    )
    .await;
    assert!(dropped.is_err());

    tokio::time::timeout(Duration::from_secs(5), async {
        while sync.applied().is_none() || sync.phase() != SyncPhase::Idle {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(sync.phase(), SyncPhase::Idle);
    assert_eq!(sync.tracked_process().await, Some(ProcessId(100)));
}
