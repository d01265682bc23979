//! HTTP request handlers for the streamable endpoint.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::legacy::LegacyRouter;
use super::state::AppState;
use crate::error::{Result, TransportError};
use crate::protocol::{EngineContext, JsonRpcMessage};
use crate::session::{
    validate_session_id, SessionHandle, SessionInfo, SessionKind, TerminationReason,
};
use crate::stats::StatsSummary;
use crate::transport::OutboundStream;

/// Header carrying the session id on the streamable endpoint
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Streamable endpoint path
pub const MCP_PATH: &str = "/mcp";

/// Create the full router: streamable endpoint, legacy endpoints, health/status
pub fn create_router(state: Arc<AppState>) -> Router {
    let mcp = Router::new()
        .route(
            MCP_PATH,
            get(open_stream).post(post_message).delete(delete_session),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            enforce_filters,
        ));

    let legacy = LegacyRouter::new(Arc::clone(&state.sessions), state.config.legacy_sse);

    Router::new()
        // Health and status
        .route("/health", get(health_check))
        .route("/status", get(status))
        .merge(mcp)
        .merge(legacy.routes())
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the filter chain before any session logic
async fn enforce_filters(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(rejection) = state
        .filters
        .check(request.method(), request.uri(), request.headers())
    {
        state.stats.record_filter_rejection();
        return rejection.into_response();
    }
    next.run(request).await
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Status response
#[derive(Serialize)]
pub struct StatusResponse {
    /// Always "ok"
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Seconds since start
    pub uptime_secs: u64,
    /// Live sessions
    pub active_sessions: usize,
    /// Whether `/sse` and `/messages` are mounted
    pub legacy_sse: bool,
    /// Counters
    pub stats: StatsSummary,
    /// Per-session detail
    pub sessions: Vec<SessionInfo>,
}

/// Status endpoint
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.sessions.snapshot().await;

    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime().as_secs(),
        active_sessions: sessions.len(),
        legacy_sse: state.config.legacy_sse,
        stats: state.stats.summary(),
        sessions,
    })
}

/// Record latency and failure for a handled request
fn finish(state: &AppState, started: Instant, result: Result<Response>) -> Response {
    let response = result.unwrap_or_else(IntoResponse::into_response);
    state
        .stats
        .record_request(started.elapsed(), response.status().is_server_error());
    response
}

/// Session id from the request header, if any
fn session_id(headers: &HeaderMap) -> Result<Option<String>> {
    let Some(value) = headers.get(SESSION_ID_HEADER) else {
        return Ok(None);
    };
    let id = value
        .to_str()
        .map_err(|_| TransportError::Validation("session id header is not ASCII".to_string()))?;
    validate_session_id(id)?;
    Ok(Some(id.to_string()))
}

fn require_session_id(headers: &HeaderMap) -> Result<String> {
    session_id(headers)?
        .ok_or_else(|| TransportError::Validation("missing Mcp-Session-Id header".to_string()))
}

/// POST /mcp
async fn post_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let result = handle_post(&state, &headers, &body).await;
    finish(&state, started, result)
}

async fn handle_post(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<Response> {
    let id = session_id(headers)?;
    let message = JsonRpcMessage::parse(body)?;

    let Some(id) = id else {
        if message.is_initialize() {
            return initialize(state, message).await;
        }
        return Err(TransportError::Validation(
            "missing Mcp-Session-Id header; only initialize may open a session".to_string(),
        ));
    };

    let session = state.sessions.get_kind(&id, SessionKind::Streamable).await?;
    state.sessions.touch(&id).await?;

    if message.is_heartbeat_reply() {
        tracing::trace!(session_id = %id, "heartbeat reply");
        return Ok(StatusCode::ACCEPTED.into_response());
    }

    let ctx = engine_context(&session);
    match state.engine.handle(&ctx, message).await? {
        Some(reply) => Ok(Json(reply).into_response()),
        None => Ok(StatusCode::ACCEPTED.into_response()),
    }
}

/// Open a session for an initialize request and answer it
async fn initialize(state: &AppState, message: JsonRpcMessage) -> Result<Response> {
    let factory = Arc::clone(&state.factory);
    let session = state
        .sessions
        .create(SessionKind::Streamable, move || factory())
        .await?;

    let ctx = engine_context(&session);
    let reply = match state.engine.handle(&ctx, message).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(session_id = %session.id, error = %e, "initialize failed");
            if let Err(te) = state
                .sessions
                .terminate_with(&session.id, TerminationReason::Failed)
                .await
            {
                tracing::debug!(session_id = %session.id, error = %te, "session already gone");
            }
            return Err(e);
        }
    };

    let mut response = match reply {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };
    let header = HeaderValue::from_str(&session.id)
        .map_err(|e| TransportError::Server(format!("invalid session id header: {e}")))?;
    response.headers_mut().insert(SESSION_ID_HEADER, header);
    Ok(response)
}

/// GET /mcp
async fn open_stream(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let result = handle_open_stream(&state, &headers).await;
    finish(&state, started, result)
}

async fn handle_open_stream(state: &AppState, headers: &HeaderMap) -> Result<Response> {
    let id = require_session_id(headers)?;
    let session = state.sessions.get_kind(&id, SessionKind::Streamable).await?;
    let stream = session.transport.subscribe()?;
    state.sessions.touch(&id).await?;

    tracing::debug!(session_id = %id, "notification stream opened");
    Ok(Sse::new(message_events(stream))
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// DELETE /mcp
async fn delete_session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let result = handle_delete(&state, &headers).await;
    finish(&state, started, result)
}

async fn handle_delete(state: &AppState, headers: &HeaderMap) -> Result<Response> {
    let id = require_session_id(headers)?;
    state.sessions.get_kind(&id, SessionKind::Streamable).await?;
    state.sessions.terminate(&id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) fn engine_context(session: &SessionHandle) -> EngineContext {
    EngineContext {
        session_id: session.id.clone(),
        transport: Arc::clone(&session.transport),
    }
}

/// Outbound messages as SSE `message` events
pub(crate) fn message_events(
    stream: OutboundStream,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    stream.filter_map(|message| async move {
        match serde_json::to_string(&message) {
            Ok(json) => Some(Ok(Event::default().event("message").data(json))),
            Err(e) => {
                tracing::warn!(error = %e, "dropping unserializable outbound message");
                None
            }
        }
    })
}
