//! HTTP dispatch: one route per registered capability, unary or
//! streaming, selected at router construction time.
//!
//! Streaming routes return the response immediately, wrapping the
//! readable half of a fresh [`StreamSession`], while the pump runs
//! detached under the gateway [`Supervisor`]. The HTTP caller never
//! observes pump errors; the supervisor does.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use bytes::Bytes;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::capability::{Capability, CapabilityRequest};
use crate::config::{CapabilitySettings, GlobalConfig};
use crate::lifecycle::AgentLifecycle;
use crate::stream::{run_pump, StreamSession};
use crate::supervisor::Supervisor;
use crate::AppError;

/// Transport mode of a registered route; modes are mutually exclusive
/// per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Single request/response exchange, `POST /c/{name}`.
    Unary,
    /// Continuous SSE event stream, `GET /c/{name}`.
    Stream,
}

/// One registered capability: its transport mode and lifecycle binding.
struct RegisteredCapability {
    mode: RouteMode,
    lifecycle: Arc<AgentLifecycle>,
}

/// Shared gateway state: the capability registry and the background
/// task supervisor.
pub struct GatewayState {
    routes: HashMap<String, RegisteredCapability>,
    supervisor: Supervisor,
    stream_buffer_frames: usize,
}

impl GatewayState {
    /// Empty registry configured from `config`.
    #[must_use]
    pub fn new(config: &GlobalConfig) -> Self {
        Self {
            routes: HashMap::new(),
            supervisor: Supervisor::new(),
            stream_buffer_frames: config.stream_buffer_frames,
        }
    }

    /// Register `capability` under `name` with the given transport mode
    /// and settings.
    ///
    /// Registration replaces any previous capability of the same name;
    /// initialization runs lazily on first use.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mode: RouteMode,
        capability: Arc<dyn Capability>,
        settings: CapabilitySettings,
    ) {
        let lifecycle = Arc::new(AgentLifecycle::new(capability, settings));
        self.routes
            .insert(name.into(), RegisteredCapability { mode, lifecycle });
    }

    /// The gateway's background task supervisor.
    #[must_use]
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Lifecycle binding for a registered capability, if any.
    #[must_use]
    pub fn lifecycle(&self, name: &str) -> Option<Arc<AgentLifecycle>> {
        self.routes.get(name).map(|r| Arc::clone(&r.lifecycle))
    }

    fn route(&self, name: &str) -> Option<&RegisteredCapability> {
        self.routes.get(name)
    }
}

/// Build the gateway router over shared state.
#[must_use]
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/c/{name}",
            get(handle_stream)
                .post(handle_unary)
                .options(handle_preflight),
        )
        .with_state(state)
}

/// Handler for `GET /health` — returns 200 OK with a plain-text body.
async fn health() -> &'static str {
    "ok"
}

async fn handle_unary(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let Some(route) = state.route(&name) else {
        return error_response(&AppError::NotFound(format!("no capability named {name}")));
    };
    if route.mode != RouteMode::Unary {
        return method_not_allowed("capability is streaming; use GET");
    }

    let body = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => Some(value),
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("invalid json body: {err}") })),
                )
                    .into_response()
            }
        }
    };

    if let Err(err) = route.lifecycle.ready().await {
        return error_response(&err);
    }

    let request = CapabilityRequest { params, body };
    match route.lifecycle.capability().handle_unary(request).await {
        Ok(value) => Json(value).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn handle_stream(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(route) = state.route(&name) else {
        return error_response(&AppError::NotFound(format!("no capability named {name}")));
    };
    if route.mode != RouteMode::Stream {
        return method_not_allowed("capability is unary; use POST");
    }
    // Initialization must complete before any frame is written; on
    // failure no session is ever opened.
    if let Err(err) = route.lifecycle.ready().await {
        return error_response(&err);
    }

    let (writer, reader) = StreamSession::open(state.stream_buffer_frames);
    let request = CapabilityRequest { params, body: None };
    let capability = route.lifecycle.capability();

    // Detach the pump; the supervisor keeps it alive past this handler's
    // return and observes its completion. The response goes out now.
    let _task = state
        .supervisor
        .spawn(run_pump(name, capability, request, writer));

    sse_response(reader.into_body())
}

async fn handle_preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    apply_cors_headers(&mut response);
    response
}

/// Wrap a streaming body with the fixed SSE response headers.
fn sse_response(body: Body) -> Response {
    let mut response = Response::new(body);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    apply_cors_headers(&mut response);
    response
}

fn apply_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

fn method_not_allowed(detail: &str) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": detail })),
    )
        .into_response()
}

/// Map an application error onto its HTTP representation.
///
/// Only initialization and unary handler failures reach this path;
/// streaming-phase errors never become status codes.
fn error_response(err: &AppError) -> Response {
    let status = match err {
        AppError::Init(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Handler(_) | AppError::Stream(_) | AppError::Config(_) | AppError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
