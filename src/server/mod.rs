//! HTTP server.
//!
//! Endpoints:
//! - `POST|GET|DELETE /mcp` - streamable transport, behind the filter chain
//! - `GET /sse` + `POST /messages` - legacy transport (501 unless enabled)
//! - `GET /health`, `GET /status`
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_transport::config::SessionConfig;
//! use mcp_transport::server::{Server, ServerConfig};
//!
//! # async fn run() -> mcp_transport::Result<()> {
//! let config = ServerConfig::default().with_port(8080);
//! let server = Server::new(config, SessionConfig::default());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod handlers;
mod legacy;
mod lifecycle;
mod state;

pub use config::{ServerConfig, MAX_BODY_SIZE_RANGE};
pub use handlers::{create_router, health_check, MCP_PATH, SESSION_ID_HEADER};
pub use legacy::{LegacyRouter, LEGACY_MESSAGES_PATH, LEGACY_STREAM_PATH};
pub use lifecycle::{shutdown_signal, Server};
pub use state::AppState;
