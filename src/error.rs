//! Transport error types.
//!
//! Every fallible operation in the crate returns [`TransportError`]. Session
//! lookups, capacity checks and request validation each have a dedicated
//! variant so the HTTP layer can map them to a status code without string
//! matching (see [`TransportError::status_code`]).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::config::ConfigError;

/// Transport layer errors.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No active session with this id.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Session exists but has been idle past its timeout.
    #[error("Session expired: {0}")]
    Expired(String),

    /// Registry already holds `max_count` sessions.
    #[error("Session capacity exceeded ({0} sessions)")]
    CapacityExceeded(usize),

    /// Generated id collided with a live session.
    ///
    /// Internal invariant violation; never expected to reach a client.
    #[error("Duplicate session id: {0}")]
    DuplicateId(String),

    /// Manager is draining; no new sessions are accepted.
    #[error("Server is shutting down")]
    ShuttingDown,

    /// Malformed request shape.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A notification stream is already attached to the session.
    #[error("Notification stream already attached")]
    StreamConflict,

    /// Outbound queue is full; the client is not draining its stream.
    #[error("Outbound queue full")]
    QueueFull,

    /// Session transport failed to send or close.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Protocol engine failed to process a message.
    #[error("Engine error: {0}")]
    Engine(String),

    /// Server-side error.
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    /// HTTP status a client sees for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::Expired(_) => StatusCode::NOT_FOUND,
            Self::CapacityExceeded(_) | Self::ShuttingDown | Self::QueueFull => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Validation(_) | Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::StreamConflict => StatusCode::CONFLICT,
            Self::DuplicateId(_)
            | Self::Transport(_)
            | Self::Engine(_)
            | Self::Server(_)
            | Self::Config(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error means "this session is gone" to a caller.
    pub fn is_session_gone(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Expired(_))
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        error_response(status, &self.to_string())
    }
}

/// JSON error body shared by every rejection: `{"error":{"code","reason"}}`.
pub fn error_response(status: StatusCode, reason: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "reason": reason,
            }
        })),
    )
        .into_response()
}
