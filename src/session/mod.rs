//! Session lifecycle.
//!
//! A session is one logical client connection bound to one transport handle.
//! Its state only moves forward:
//!
//! ```text
//! ACTIVE ──terminate──> CLOSING ──transport closed──> CLOSED (removed)
//! ```
//!
//! The [`SessionManager`] is the only component that creates or destroys
//! sessions. It runs two background passes: an idle sweep every
//! `cleanup_interval` and heartbeat supervision every `keep_alive_interval`.

mod clock;
mod manager;
mod registry;
mod scheduler;

pub use clock::{Clock, ManualClock, TokioClock};
pub use manager::SessionManager;
pub use registry::{Session, SessionRegistry};
pub use scheduler::{PeriodicTask, Scheduler, TaskHandle, TokioScheduler};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Result, TransportError};
use crate::transport::SessionTransport;

/// Session identifier (UUID v4 text)
pub type SessionId = String;

/// Longest identifier accepted from a client
pub const MAX_SESSION_ID_LEN: usize = 256;

/// Identifier space a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Created by the streamable `/mcp` endpoint
    Streamable,
    /// Created by the legacy `/sse` endpoint
    Legacy,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streamable => f.write_str("streamable"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    /// Accepting traffic
    Active,
    /// Transport close in progress
    Closing,
    /// Transport closed, removed from the registry
    Closed,
}

/// Why a session was terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Client asked for it
    Client,
    /// Idle past the timeout
    Expired,
    /// Heartbeats missed or probe send failed
    Heartbeat,
    /// Client dropped its stream
    Disconnected,
    /// Server shutdown
    Shutdown,
    /// Session setup failed
    Failed,
}

impl TerminationReason {
    /// Every reason, for aggregation
    pub const ALL: [Self; 6] = [
        Self::Client,
        Self::Expired,
        Self::Heartbeat,
        Self::Disconnected,
        Self::Shutdown,
        Self::Failed,
    ];

    /// Label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Expired => "expired",
            Self::Heartbeat => "heartbeat",
            Self::Disconnected => "disconnected",
            Self::Shutdown => "shutdown",
            Self::Failed => "failed",
        }
    }
}

/// Caller's view of a live session.
#[derive(Clone)]
pub struct SessionHandle {
    /// Session id
    pub id: SessionId,
    /// Identifier space
    pub kind: SessionKind,
    /// Bound transport
    pub transport: Arc<dyn SessionTransport>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("transport", &self.transport.name())
            .finish()
    }
}

/// Point-in-time description of a session, for status output.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    /// Session id
    pub id: SessionId,
    /// Identifier space
    pub kind: SessionKind,
    /// Current state
    pub state: SessionState,
    /// Time since creation
    #[serde(rename = "age_ms", serialize_with = "as_millis")]
    pub age: Duration,
    /// Time since last activity
    #[serde(rename = "idle_ms", serialize_with = "as_millis")]
    pub idle: Duration,
    /// Unanswered heartbeat rounds
    pub missed_heartbeats: u32,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Check a client-supplied session id.
///
/// Ids are opaque; only length and printable ASCII are enforced.
pub fn validate_session_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(TransportError::Validation(
            "session id must not be empty".to_string(),
        ));
    }
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(TransportError::Validation(format!(
            "session id exceeds {MAX_SESSION_ID_LEN} characters"
        )));
    }
    if !id.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(TransportError::Validation(
            "session id must be visible ASCII".to_string(),
        ));
    }
    Ok(())
}
