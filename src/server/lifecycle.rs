//! Server lifecycle: bind, start timers, serve, drain on shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use super::config::ServerConfig;
use super::handlers::create_router;
use super::legacy::LegacyRouter;
use super::state::AppState;
use crate::config::SessionConfig;
use crate::error::{Result, TransportError};
use crate::session::TokioScheduler;

/// HTTP server owning the shared state.
#[derive(Debug)]
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a server with the built-in engine
    pub fn new(config: ServerConfig, session: SessionConfig) -> Self {
        Self::from_state(AppState::new(config, session))
    }

    /// Create a server over prepared state
    pub fn from_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Shared state
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Router for the configured endpoints
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    /// Legacy endpoint controller
    pub fn legacy(&self) -> LegacyRouter {
        LegacyRouter::new(
            Arc::clone(&self.state.sessions),
            self.state.config.legacy_sse,
        )
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.state.config.addr;
        TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Server(format!("failed to bind {addr}: {e}")))
    }

    /// Serve until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// Sessions are drained before the listener is released: the legacy
    /// streams first, then every remaining session.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr()?;
        self.state.sessions.start(&TokioScheduler);

        tracing::info!(
            %addr,
            legacy_sse = self.state.config.legacy_sse,
            filters = ?self.state.filters.names(),
            "mcp-transport listening"
        );

        let state = Arc::clone(&self.state);
        let legacy = self.legacy();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("shutdown signal received; draining sessions");
                drain(&state, &legacy).await;
            })
            .await
            .map_err(|e| TransportError::Server(format!("server error: {e}")))?;

        tracing::info!("server stopped");
        Ok(())
    }

    /// Close every session (legacy first). Used on shutdown.
    pub async fn drain(&self) {
        drain(&self.state, &self.legacy()).await;
    }
}

async fn drain(state: &AppState, legacy: &LegacyRouter) {
    if legacy.is_enabled() {
        let closed = legacy.drain().await;
        tracing::info!(closed, "legacy sessions drained");
    }
    state.sessions.close_all().await;
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
