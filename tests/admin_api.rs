//! Admin router exercised in-process.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{vid, Harness, A, B};
use serde_json::{json, Value};
use tower::ServiceExt;
use validator_oracle::api::{create_router, AppState};

fn app(h: &Harness) -> Router {
    create_router(AppState {
        store: h.store.clone(),
        status: h.status.clone(),
    })
}

async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_add_then_list_returns_canonical_id() {
    let h = Harness::new();

    let (status, body) = call(
        app(&h),
        Method::POST,
        "/validators",
        Some(json!({"validator": A.to_uppercase().replace("0X", "0x")})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("added"));
    assert_eq!(body["changed"], true);

    let (status, body) = call(app(&h), Method::GET, "/validators", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"validators": [A]}));
}

#[tokio::test]
async fn test_add_is_idempotent() {
    let h = Harness::new();
    h.track(A);

    let (status, body) = call(app(&h), Method::POST, "/validators/add", Some(json!({"id": A}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], false);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_missing_identifier_is_bad_request() {
    let h = Harness::new();

    let (status, body) = call(app(&h), Method::POST, "/validators", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = call(app(&h), Method::POST, "/validators", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        app(&h),
        Method::DELETE,
        "/validators",
        Some(json!({"validator": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_unparseable_identifier_is_bad_request() {
    let h = Harness::new();
    let (status, body) = call(
        app(&h),
        Method::POST,
        "/validators",
        Some(json!({"validator": "0xnot-hex"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("hexadecimal"));
}

#[tokio::test]
async fn test_remove_via_delete_and_compat_path() {
    let h = Harness::new();
    h.track(A);
    h.track(B);

    let (status, body) = call(
        app(&h),
        Method::DELETE,
        "/validators",
        Some(json!({"validator": A})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (status, body) = call(
        app(&h),
        Method::POST,
        "/validators/remove",
        Some(json!({"validator_id": B})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    // Removing an absent id is a no-op, not an error.
    let (status, body) = call(
        app(&h),
        Method::POST,
        "/validators/remove",
        Some(json!({"validator": B})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], false);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let h = Harness::new();
    h.track(A);
    // A directory squatting on the temp path makes the next write fail.
    std::fs::create_dir(h.dir.path().join("tracked_validators.txt.tmp")).unwrap();

    let (status, body) = call(
        app(&h),
        Method::POST,
        "/validators",
        Some(json!({"validator": B})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert_eq!(message, "failed to update tracked validators");
    assert!(!message.contains(h.dir.path().to_str().unwrap()));
    assert!(h.store.list().contains(&vid(A)));
    assert!(!h.store.list().contains(&vid(B)));
}

#[tokio::test]
async fn test_health_reports_cycle_status() {
    let h = Harness::new();
    h.track(A);
    h.provider.fail_price();
    h.default_scheduler().run_cycle().await;

    let (status, body) = call(app(&h), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["tracked_validators"], 1);
    assert_eq!(body["cycles"], 1);
    assert_eq!(body["failed_cycles"], 1);
    assert_eq!(body["consecutive_failed_cycles"], 1);
    assert_eq!(body["last_cycle"]["failed"], true);
}
