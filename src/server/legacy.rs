//! Legacy HTTP+SSE endpoints (`/sse` + `/messages`).
//!
//! The client opens a long-lived `GET /sse` stream, receives an `endpoint`
//! event naming its submission URL, and POSTs messages there. Replies come
//! back over the stream as `message` events, never in the POST response.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{any, get, post},
    Router,
};
use futures::{stream, StreamExt};
use serde::Deserialize;

use super::handlers::{engine_context, message_events};
use super::state::AppState;
use crate::error::{error_response, Result, TransportError};
use crate::protocol::JsonRpcMessage;
use crate::session::{validate_session_id, SessionId, SessionKind, SessionManager, TerminationReason};

/// Stream endpoint path
pub const LEGACY_STREAM_PATH: &str = "/sse";

/// Message submission path
pub const LEGACY_MESSAGES_PATH: &str = "/messages";

/// Mounts the legacy endpoints and drains legacy sessions on shutdown.
#[derive(Clone)]
pub struct LegacyRouter {
    sessions: Arc<SessionManager>,
    enabled: bool,
}

impl std::fmt::Debug for LegacyRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyRouter")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl LegacyRouter {
    /// Create over the shared session manager
    pub fn new(sessions: Arc<SessionManager>, enabled: bool) -> Self {
        Self { sessions, enabled }
    }

    /// Whether the endpoints are live
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Routes for `/sse` and `/messages`.
    ///
    /// Disabled, both answer 501 for every method.
    pub fn routes(&self) -> Router<Arc<AppState>> {
        if self.enabled {
            Router::new()
                .route(LEGACY_STREAM_PATH, get(open_legacy_stream))
                .route(LEGACY_MESSAGES_PATH, post(post_legacy_message))
        } else {
            Router::new()
                .route(LEGACY_STREAM_PATH, any(not_implemented))
                .route(LEGACY_MESSAGES_PATH, any(not_implemented))
        }
    }

    /// Terminate every legacy session. Returns how many were closed.
    pub async fn drain(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        self.sessions.close_kind(SessionKind::Legacy).await
    }
}

async fn not_implemented() -> Response {
    error_response(
        StatusCode::NOT_IMPLEMENTED,
        "legacy SSE transport is disabled",
    )
}

/// Terminates the session when the client's stream is dropped.
struct DisconnectGuard {
    sessions: Arc<SessionManager>,
    id: SessionId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let sessions = Arc::clone(&self.sessions);
        let id = std::mem::take(&mut self.id);
        runtime.spawn(async move {
            match sessions
                .terminate_with(&id, TerminationReason::Disconnected)
                .await
            {
                Ok(()) => tracing::debug!(session_id = %id, "legacy stream disconnected"),
                // Already terminated by the server side
                Err(e) if e.is_session_gone() => {}
                Err(e) => tracing::warn!(session_id = %id, error = %e, "disconnect cleanup failed"),
            }
        });
    }
}

/// GET /sse
async fn open_legacy_stream(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    let result = handle_open(&state).await;
    let response = result.unwrap_or_else(IntoResponse::into_response);
    state
        .stats
        .record_request(started.elapsed(), response.status().is_server_error());
    response
}

async fn handle_open(state: &AppState) -> Result<Response> {
    let factory = Arc::clone(&state.factory);
    let session = state
        .sessions
        .create(SessionKind::Legacy, move || factory())
        .await?;

    let outbound = match session.transport.subscribe() {
        Ok(outbound) => outbound,
        Err(e) => {
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

    let endpoint = Event::default().event("endpoint").data(format!(
        "{LEGACY_MESSAGES_PATH}?sessionId={}",
        session.id
    ));
    let guard = DisconnectGuard {
        sessions: Arc::clone(&state.sessions),
        id: session.id.clone(),
    };

    let events = stream::once(async move { Ok::<_, Infallible>(endpoint) })
        .chain(message_events(outbound))
        .map(move |event| {
            let _guard = &guard;
            event
        });

    tracing::debug!(session_id = %session.id, "legacy stream opened");
    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// Query string of `POST /messages`
#[derive(Debug, Deserialize)]
pub struct LegacyQuery {
    /// Session id from the `endpoint` event
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// POST /messages?sessionId=<id>
async fn post_legacy_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LegacyQuery>,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let result = handle_message(&state, query, &body).await;
    let response = result.unwrap_or_else(IntoResponse::into_response);
    state
        .stats
        .record_request(started.elapsed(), response.status().is_server_error());
    response
}

async fn handle_message(state: &AppState, query: LegacyQuery, body: &[u8]) -> Result<Response> {
    let id = query.session_id.ok_or_else(|| {
        TransportError::Validation("missing sessionId query parameter".to_string())
    })?;
    validate_session_id(&id)?;

    let session = state.sessions.get_kind(&id, SessionKind::Legacy).await?;
    let message = JsonRpcMessage::parse(body)?;
    state.sessions.touch(&id).await?;

    if message.is_heartbeat_reply() {
        tracing::trace!(session_id = %id, "heartbeat reply");
        return Ok(StatusCode::ACCEPTED.into_response());
    }

    let ctx = engine_context(&session);
    if let Some(reply) = state.engine.handle(&ctx, message).await? {
        ctx.transport.send(reply).await?;
    }
    Ok(StatusCode::ACCEPTED.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    #[tokio::test]
    async fn test_drain_only_closes_legacy() {
        let sessions = Arc::new(SessionManager::new(SessionConfig::default()));
        let factory = crate::transport::channel_factory();

        let legacy = sessions
            .create(SessionKind::Legacy, || factory())
            .await
            .unwrap();
        let streamable = sessions
            .create(SessionKind::Streamable, || factory())
            .await
            .unwrap();

        let router = LegacyRouter::new(Arc::clone(&sessions), true);
        assert_eq!(router.drain().await, 1);
        assert!(sessions.get(&legacy.id).await.is_err());
        assert!(sessions.get(&streamable.id).await.is_ok());
        assert!(legacy.transport.is_closed());
    }

    #[tokio::test]
    async fn test_disabled_drain_is_noop() {
        let sessions = Arc::new(SessionManager::new(SessionConfig::default()));
        let router = LegacyRouter::new(sessions, false);
        assert!(!router.is_enabled());
        assert_eq!(router.drain().await, 0);
    }

    #[tokio::test]
    async fn test_guard_drop_terminates() {
        let sessions = Arc::new(SessionManager::new(SessionConfig::default()));
        let factory = crate::transport::channel_factory();
        let handle = sessions
            .create(SessionKind::Legacy, || factory())
            .await
            .unwrap();

        drop(DisconnectGuard {
            sessions: Arc::clone(&sessions),
            id: handle.id.clone(),
        });
        // Let the spawned cleanup run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(sessions.is_empty().await);
        assert_eq!(sessions.stats().terminated_disconnected, 1);
    }
}
