//! Router-level tests exercising dispatch, headers, and the wire
//! format without a network listener.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use capgate::config::{CapabilitySettings, GlobalConfig};
use capgate::lifecycle::LifecycleStatus;
use capgate::routes::{build_router, GatewayState, RouteMode};

use super::helpers::{registered_state, FailingInit, SlowTicker};

const BODY_LIMIT: usize = 64 * 1024;

fn heartbeat_config(interval_ms: u64) -> GlobalConfig {
    GlobalConfig::from_toml_str(&format!(
        "[capabilities.heartbeat]\ninterval_ms = {interval_ms}\n"
    ))
    .expect("valid config")
}

#[tokio::test]
async fn health_returns_ok() {
    let state = Arc::new(registered_state(&GlobalConfig::default()));
    let response = build_router(state)
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), BODY_LIMIT).await.expect("body");
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn echo_round_trips_the_request_body() {
    let state = Arc::new(registered_state(&GlobalConfig::default()));
    let request = Request::post("/c/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"msg":"hi"}"#))
        .expect("request");

    let response = build_router(state).oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), BODY_LIMIT).await.expect("body");
    let value: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(value, json!({ "echo": { "msg": "hi" } }));
}

#[tokio::test]
async fn unknown_capability_is_not_found() {
    let state = Arc::new(registered_state(&GlobalConfig::default()));
    let response = build_router(state)
        .oneshot(
            Request::get("/c/missing")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn modes_are_mutually_exclusive_per_route() {
    let state = Arc::new(registered_state(&GlobalConfig::default()));
    let router = build_router(state);

    let get_unary = router
        .clone()
        .oneshot(Request::get("/c/echo").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(get_unary.status(), StatusCode::METHOD_NOT_ALLOWED);

    let post_stream = router
        .oneshot(
            Request::post("/c/heartbeat")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(post_stream.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn preflight_returns_permissive_cors() {
    let state = Arc::new(registered_state(&GlobalConfig::default()));
    let response = build_router(state)
        .oneshot(
            Request::options("/c/heartbeat")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, OPTIONS"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
}

#[tokio::test]
async fn stream_response_carries_the_fixed_sse_headers() {
    let state = Arc::new(registered_state(&heartbeat_config(1)));
    let response = build_router(state)
        .oneshot(
            Request::get("/c/heartbeat?limit=1")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers[header::CONNECTION], "keep-alive");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn tick_stream_bytes_match_the_wire_contract() {
    let state = Arc::new(registered_state(&heartbeat_config(1)));
    let response = build_router(state)
        .oneshot(
            Request::get("/c/heartbeat?limit=2")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    let body = to_bytes(response.into_body(), BODY_LIMIT).await.expect("body");
    assert_eq!(
        &body[..],
        b"data: {\"type\":\"tick\",\"n\":1}\n\ndata: {\"type\":\"tick\",\"n\":2}\n\n"
    );
}

#[tokio::test]
async fn failed_initialization_yields_503_and_opens_no_stream() {
    let mut state = GatewayState::new(&GlobalConfig::default());
    state.register(
        "broken",
        RouteMode::Stream,
        Arc::new(FailingInit),
        CapabilitySettings::empty(),
    );
    let state = Arc::new(state);

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::get("/c/broken")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let lifecycle = state.lifecycle("broken").expect("registered");
    assert!(matches!(lifecycle.status(), LifecycleStatus::Failed(_)));
    // No pump was ever detached for the failed route.
    assert!(state.supervisor().is_empty());
}

#[tokio::test]
async fn initialization_completes_before_the_response_is_returned() {
    let mut state = GatewayState::new(&GlobalConfig::default());
    state.register(
        "slow",
        RouteMode::Stream,
        Arc::new(SlowTicker),
        CapabilitySettings::empty(),
    );
    let state = Arc::new(state);

    let response = build_router(Arc::clone(&state))
        .oneshot(Request::get("/c/slow").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    // The response exists only after `ready()` resolved, so no frame
    // can precede the Ready status.
    let lifecycle = state.lifecycle("slow").expect("registered");
    assert_eq!(lifecycle.status(), LifecycleStatus::Ready);

    let body = to_bytes(response.into_body(), BODY_LIMIT).await.expect("body");
    assert_eq!(&body[..], b"data: {\"type\":\"tick\",\"n\":1}\n\n");
}

#[tokio::test]
async fn unary_handler_error_surfaces_as_the_http_response() {
    // Heartbeat has no unary handler; register it on a unary route and
    // the default rejection becomes the error response.
    let mut state = GatewayState::new(&GlobalConfig::default());
    state.register(
        "miswired",
        RouteMode::Unary,
        Arc::new(capgate::capability::heartbeat::Heartbeat::new()),
        CapabilitySettings::empty(),
    );

    let response = build_router(Arc::new(state))
        .oneshot(
            Request::post("/c/miswired")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(response.into_body(), BODY_LIMIT).await.expect("body");
    let value: Value = serde_json::from_slice(&body).expect("json");
    assert!(value["error"]
        .as_str()
        .expect("error message")
        .contains("unary"));
}
