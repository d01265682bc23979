//! In-memory session store.
//!
//! No timers and no I/O. The manager serializes access.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{SessionHandle, SessionId, SessionInfo, SessionKind, SessionState};
use crate::error::{Result, TransportError};
use crate::transport::SessionTransport;

/// A registered session
pub struct Session {
    id: SessionId,
    kind: SessionKind,
    transport: Arc<dyn SessionTransport>,
    created_at: Instant,
    last_activity: Instant,
    missed_heartbeats: u32,
    awaiting_heartbeat: bool,
    state: SessionState,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("missed_heartbeats", &self.missed_heartbeats)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// New ACTIVE session
    pub fn new(
        id: SessionId,
        kind: SessionKind,
        transport: Arc<dyn SessionTransport>,
        now: Instant,
    ) -> Self {
        Self {
            id,
            kind,
            transport,
            created_at: now,
            last_activity: now,
            missed_heartbeats: 0,
            awaiting_heartbeat: false,
            state: SessionState::Active,
        }
    }

    /// Get session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get identifier space
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if session accepts traffic
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Get bound transport
    pub fn transport(&self) -> Arc<dyn SessionTransport> {
        Arc::clone(&self.transport)
    }

    /// Get unanswered heartbeat rounds
    pub fn missed_heartbeats(&self) -> u32 {
        self.missed_heartbeats
    }

    /// Whether the last probe is unanswered
    pub fn awaiting_heartbeat(&self) -> bool {
        self.awaiting_heartbeat
    }

    /// Time since last activity
    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Record a liveness signal
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
        self.missed_heartbeats = 0;
        self.awaiting_heartbeat = false;
    }

    /// Advance one heartbeat round.
    ///
    /// Returns `true` if a probe should be sent, `false` if the session has
    /// run out of misses.
    pub fn heartbeat_round(&mut self, max_missed: u32) -> bool {
        if self.awaiting_heartbeat {
            self.missed_heartbeats = self.missed_heartbeats.saturating_add(1);
        }
        if self.missed_heartbeats >= max_missed {
            return false;
        }
        self.awaiting_heartbeat = true;
        true
    }

    /// Move to `next`. Returns `false` if that would not move forward.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if next <= self.state {
            return false;
        }
        self.state = next;
        true
    }

    /// Caller's handle
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id.clone(),
            kind: self.kind,
            transport: self.transport(),
        }
    }

    /// Status snapshot
    pub fn info(&self, now: Instant) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            kind: self.kind,
            state: self.state,
            age: now.saturating_duration_since(self.created_at),
            idle: self.idle(now),
            missed_heartbeats: self.missed_heartbeats,
        }
    }
}

/// Sessions keyed by id
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session. Fails if the id is already present.
    pub fn insert(&mut self, session: Session) -> Result<()> {
        if self.sessions.contains_key(&session.id) {
            return Err(TransportError::DuplicateId(session.id));
        }
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    /// Get session by ID
    pub fn get(&self, id: &str) -> Result<&Session> {
        self.sessions
            .get(id)
            .ok_or_else(|| TransportError::NotFound(id.to_string()))
    }

    /// Get mutable session by ID
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Session> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| TransportError::NotFound(id.to_string()))
    }

    /// Remove session
    pub fn remove(&mut self, id: &str) -> Option<Session> {
        self.sessions.remove(id)
    }

    /// Iterate sessions
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Iterate sessions mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    /// Get all session IDs
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }

    /// Get session count
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;

    fn session(id: &str, now: Instant) -> Session {
        Session::new(
            id.to_string(),
            SessionKind::Streamable,
            Arc::new(ChannelTransport::new()),
            now,
        )
    }

    #[test]
    fn test_insert_and_get() {
        let now = Instant::now();
        let mut registry = SessionRegistry::new();
        registry.insert(session("a", now)).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().id(), "a");
        assert!(matches!(
            registry.get("b"),
            Err(TransportError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let now = Instant::now();
        let mut registry = SessionRegistry::new();
        registry.insert(session("a", now)).unwrap();

        let err = registry.insert(session("a", now)).unwrap_err();
        assert!(matches!(err, TransportError::DuplicateId(id) if id == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove() {
        let now = Instant::now();
        let mut registry = SessionRegistry::new();
        registry.insert(session("a", now)).unwrap();

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_state_only_advances() {
        let mut s = session("a", Instant::now());
        assert!(s.advance(SessionState::Closing));
        assert!(!s.advance(SessionState::Closing));
        assert!(!s.advance(SessionState::Active));
        assert!(s.advance(SessionState::Closed));
        assert_eq!(s.state(), SessionState::Closed);
    }

    #[test]
    fn test_heartbeat_rounds() {
        let mut s = session("a", Instant::now());

        // First probe: nothing outstanding yet
        assert!(s.heartbeat_round(3));
        assert_eq!(s.missed_heartbeats(), 0);

        assert!(s.heartbeat_round(3));
        assert!(s.heartbeat_round(3));
        assert_eq!(s.missed_heartbeats(), 2);

        // Third miss exhausts the budget
        assert!(!s.heartbeat_round(3));
        assert_eq!(s.missed_heartbeats(), 3);
    }

    #[test]
    fn test_touch_resets_heartbeat() {
        let start = Instant::now();
        let mut s = session("a", start);
        s.heartbeat_round(3);
        s.heartbeat_round(3);
        assert_eq!(s.missed_heartbeats(), 1);

        let later = start + Duration::from_secs(10);
        s.touch(later);
        assert_eq!(s.missed_heartbeats(), 0);
        assert!(!s.awaiting_heartbeat());
        assert_eq!(s.idle(later), Duration::ZERO);
    }
}
