use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tower::limit::ConcurrencyLimitLayer;

use crate::api::types::SensingSnapshot;
use crate::config::ControlConfig;
use crate::engine::core::{EngineHandle, ParamPatch};
use crate::error::ErrorCode;

/// Header carrying the debug token.
const TOKEN_HEADER: &str = "x-vibe-debug-token";

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct DebugHttpState {
    pub handle: &'static EngineHandle,
    token: Arc<String>,
}

impl DebugHttpState {
    pub fn new(handle: &'static EngineHandle, token: String) -> Self {
        Self {
            handle,
            token: Arc::new(token),
        }
    }

    fn authorize(
        &self,
        headers: &HeaderMap,
        query_token: Option<&str>,
    ) -> Result<(), HttpServerError> {
        let provided = headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .or(query_token);
        match provided {
            Some(value) if value == self.token.as_str() => Ok(()),
            _ => Err(HttpServerError::Unauthorized),
        }
    }
}

/// Query payload for extracting token from URL.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub token: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    Unauthorized,
    BadRequest(String),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or invalid token".to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session_running: bool,
    pub uptime_ms: u64,
}

/// Sensing-state endpoint response payload.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub snapshot: SensingSnapshot,
    pub control: ControlConfig,
}

/// Parameter description payload.
#[derive(Debug, Serialize)]
pub struct ParamDescriptor {
    pub supported: &'static [&'static str],
    pub control: ControlConfig,
}

/// Command acknowledgement payload.
#[derive(Debug, Serialize)]
pub struct ParamAck {
    pub accepted: bool,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: DebugHttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/params", get(list_params).post(apply_params))
        .layer(ConcurrencyLimitLayer::new(8))
        .with_state(state)
}

/// Bind and serve the debug router until the process exits.
pub async fn run_http_server(state: DebugHttpState, addr: SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn health(
    State(state): State<DebugHttpState>,
    headers: HeaderMap,
    Query(auth): Query<AuthQuery>,
) -> Result<Json<HealthResponse>, HttpServerError> {
    state.authorize(&headers, auth.token.as_deref())?;
    Ok(Json(HealthResponse {
        status: "ok",
        session_running: state.handle.is_running(),
        uptime_ms: state.handle.uptime_ms(),
    }))
}

async fn status(
    State(state): State<DebugHttpState>,
    headers: HeaderMap,
    Query(auth): Query<AuthQuery>,
) -> Result<Json<StatusResponse>, HttpServerError> {
    state.authorize(&headers, auth.token.as_deref())?;
    Ok(Json(StatusResponse {
        snapshot: state.handle.sensing_snapshot(),
        control: state.handle.config_snapshot().control,
    }))
}

async fn list_params(
    State(state): State<DebugHttpState>,
    headers: HeaderMap,
    Query(auth): Query<AuthQuery>,
) -> Result<Json<ParamDescriptor>, HttpServerError> {
    state.authorize(&headers, auth.token.as_deref())?;
    Ok(Json(ParamDescriptor {
        supported: &["min_volume", "max_volume", "curve_mode"],
        control: state.handle.config_snapshot().control,
    }))
}

async fn apply_params(
    State(state): State<DebugHttpState>,
    headers: HeaderMap,
    Query(auth): Query<AuthQuery>,
    Json(patch): Json<ParamPatch>,
) -> Result<Json<ParamAck>, HttpServerError> {
    state.authorize(&headers, auth.token.as_deref())?;
    state
        .handle
        .apply_patch(patch)
        .map_err(|err| HttpServerError::BadRequest(err.message()))?;
    Ok(Json(ParamAck { accepted: true }))
}
