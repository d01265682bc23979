//! Shared server state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::ServerConfig;
use crate::config::SessionConfig;
use crate::protocol::{BasicEngine, ProtocolEngine};
use crate::security::FilterChain;
use crate::session::SessionManager;
use crate::stats::TransportStats;
use crate::transport::{channel_factory, TransportFactory};

/// Application state shared across handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Session manager
    pub sessions: Arc<SessionManager>,
    /// Protocol engine messages are forwarded to
    pub engine: Arc<dyn ProtocolEngine>,
    /// Filter chain guarding `/mcp`
    pub filters: FilterChain,
    /// Produces a transport per new session
    pub factory: TransportFactory,
    /// Statistics, shared with the session manager
    pub stats: Arc<TransportStats>,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create state with the built-in engine and channel transports
    pub fn new(config: ServerConfig, session: SessionConfig) -> Self {
        let stats = Arc::new(TransportStats::new());
        let sessions = SessionManager::new(session).with_stats(Arc::clone(&stats));
        let filters = FilterChain::from_settings(&config.security);

        Self {
            config,
            sessions: Arc::new(sessions),
            engine: Arc::new(BasicEngine::default()),
            filters,
            factory: channel_factory(),
            stats,
            start_time: Instant::now(),
        }
    }

    /// Use a different protocol engine
    pub fn with_engine(mut self, engine: Arc<dyn ProtocolEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Use a prepared session manager (e.g. with a manual clock)
    pub fn with_sessions(mut self, sessions: SessionManager) -> Self {
        let sessions = sessions.with_stats(Arc::clone(&self.stats));
        self.sessions = Arc::new(sessions);
        self
    }

    /// Replace the filter chain
    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    /// Use a different transport factory
    pub fn with_factory(mut self, factory: TransportFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}
