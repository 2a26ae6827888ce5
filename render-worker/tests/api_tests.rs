//! Router-level integration tests for the operational HTTP surface.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use render_worker::api::build_router;
use render_worker::AppState;

fn empty_state() -> AppState {
    AppState {
        prod: None,
        dev: None,
        started_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn health_endpoint_returns_ok_json_with_no_environments() {
    let app = build_router(empty_state());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap().to_string();
    assert!(content_type.contains("application/json"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["environments"], serde_json::json!({}));
}

#[tokio::test]
async fn metrics_endpoint_returns_prometheus_text_exposition() {
    let app = build_router(empty_state());

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("render_worker_uptime_seconds"));
}

#[tokio::test]
async fn unknown_route_falls_through_to_404() {
    let app = build_router(empty_state());

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
