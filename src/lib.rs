//! # MCP Transport - Session-Multiplexing HTTP Transport
//!
//! HTTP transport layer for a JSON-RPC request/response protocol server.
//! Many independent client sessions share one listener; each is identified by
//! an opaque id, bound to its own outbound transport, and supervised for
//! idleness and liveness.
//!
//! ## Features
//!
//! - **Streamable endpoint**: `POST`/`GET`/`DELETE /mcp` keyed by the `Mcp-Session-Id` header
//! - **Legacy endpoint**: `GET /sse` + `POST /messages?sessionId=`, behind a feature flag
//! - **Session supervision**: idle sweep and heartbeat probes with bounded misses
//! - **Filter chain**: host, origin, rate, protocol version, accept and content type checks
//! - **Orderly shutdown**: every transport is closed before the listener goes away
//!
//! ## Architecture
//!
//! ```text
//!  Client ──HTTP──> Filter Chain ──> Streamable Router ──┐
//!                                                        ├──> Session Manager ──> Registry
//!  Client ──HTTP──────────────────> Legacy Router ───────┘          │
//!                                                                   ├── sweep (cleanup_interval)
//!                                                                   └── heartbeat (keep_alive_interval)
//! ```
//!
//! ### Session State Machine
//!
//! ```text
//!     [Active] ──terminate──> [Closing] ──close settled──> [Closed]
//! ```
//!
//! A session is terminated by client DELETE, idle expiry, heartbeat failure,
//! a dropped legacy stream, or server shutdown. Termination is at-most-once:
//! only the caller that moves a session out of `Active` closes its transport.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcp_transport::{Config, Server};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut config = Config::load_default()?;
//! config.apply_env()?;
//! let (server_config, session_config) = config.validate()?;
//!
//! Server::new(server_config, session_config).run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`session`]: Session registry, manager, clock and scheduler
//! - [`transport`]: Per-session outbound transport
//! - [`server`]: HTTP routers and lifecycle (Axum-based)
//! - [`security`]: Request filter chain
//! - [`protocol`]: JSON-RPC envelope and protocol engine contract
//! - [`config`]: Configuration management
//! - [`stats`]: Counters for `/status`
//! - [`error`]: Error types and result aliases

pub mod config;
pub mod error;
pub mod protocol;
pub mod security;
pub mod server;
pub mod session;
pub mod stats;
pub mod transport;

// Re-exports for convenience
pub use config::{Config, ConfigError, SessionConfig};
pub use error::{Result, TransportError};
pub use protocol::{BasicEngine, EngineContext, JsonRpcMessage, ProtocolEngine};
pub use security::{FilterChain, Rejection, RequestFilter};
pub use server::{AppState, Server, ServerConfig};
pub use session::{SessionHandle, SessionKind, SessionManager, SessionState};
pub use stats::{StatsSummary, TransportStats};
pub use transport::{ChannelTransport, SessionTransport, TransportFactory};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
