//! Protocol engine contract and the built-in engine.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::json;

use super::message::{codes, JsonRpcMessage, INITIALIZE_METHOD, PING_METHOD};
use super::{LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};
use crate::error::Result;
use crate::session::SessionId;
use crate::transport::SessionTransport;

/// What the engine knows about the session a message arrived on.
#[derive(Clone)]
pub struct EngineContext {
    /// Session the message is addressed to
    pub session_id: SessionId,
    /// Bound transport, for server-initiated pushes
    pub transport: Arc<dyn SessionTransport>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Processes protocol messages on behalf of a session.
///
/// Returning `Ok(None)` means "no direct reply" (notifications, client
/// responses). `Err` is reserved for failures of the engine itself; protocol
/// level errors are JSON-RPC error responses.
pub trait ProtocolEngine: Send + Sync {
    /// Handle one inbound message.
    fn handle<'a>(
        &'a self,
        ctx: &'a EngineContext,
        message: JsonRpcMessage,
    ) -> BoxFuture<'a, Result<Option<JsonRpcMessage>>>;
}

/// Minimal engine: answers `initialize` and `ping`, rejects everything else.
#[derive(Debug, Clone)]
pub struct BasicEngine {
    name: String,
    version: String,
}

impl Default for BasicEngine {
    fn default() -> Self {
        Self::new("mcp-transport", env!("CARGO_PKG_VERSION"))
    }
}

impl BasicEngine {
    /// Create an engine reporting the given server identity
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    fn respond(&self, message: &JsonRpcMessage) -> Option<JsonRpcMessage> {
        if !message.is_request() {
            return None;
        }

        let id = message.id.clone();
        match message.method.as_deref() {
            Some(INITIALIZE_METHOD) => {
                let requested = message
                    .params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(|v| v.as_str());
                let version = match requested {
                    Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v) => v,
                    _ => LATEST_PROTOCOL_VERSION,
                };
                Some(JsonRpcMessage::result(
                    id,
                    json!({
                        "protocolVersion": version,
                        "capabilities": {},
                        "serverInfo": {
                            "name": self.name,
                            "version": self.version,
                        }
                    }),
                ))
            },
            Some(PING_METHOD) => Some(JsonRpcMessage::result(id, json!({}))),
            Some(other) => Some(JsonRpcMessage::error(
                id,
                codes::METHOD_NOT_FOUND,
                &format!("Method not found: {other}"),
            )),
            None => None,
        }
    }
}

impl ProtocolEngine for BasicEngine {
    fn handle<'a>(
        &'a self,
        ctx: &'a EngineContext,
        message: JsonRpcMessage,
    ) -> BoxFuture<'a, Result<Option<JsonRpcMessage>>> {
        Box::pin(async move {
            tracing::debug!(
                session_id = %ctx.session_id,
                method = message.method.as_deref().unwrap_or("-"),
                "engine handling message"
            );
            Ok(self.respond(&message))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;

    fn ctx() -> EngineContext {
        EngineContext {
            session_id: "s-1".to_string(),
            transport: Arc::new(ChannelTransport::new()),
        }
    }

    #[tokio::test]
    async fn test_initialize_negotiates_version() {
        let engine = BasicEngine::default();
        let ctx = ctx();

        let init = JsonRpcMessage::request(
            1,
            "initialize",
            Some(json!({"protocolVersion": "2024-11-05"})),
        );
        let reply = engine.handle(&ctx, init).await.unwrap().unwrap();
        let result = reply.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "mcp-transport");

        let unknown = JsonRpcMessage::request(
            2,
            "initialize",
            Some(json!({"protocolVersion": "1999-01-01"})),
        );
        let reply = engine.handle(&ctx, unknown).await.unwrap().unwrap();
        assert_eq!(
            reply.result.unwrap()["protocolVersion"],
            LATEST_PROTOCOL_VERSION
        );
    }

    #[tokio::test]
    async fn test_ping_and_unknown_method() {
        let engine = BasicEngine::default();
        let ctx = ctx();

        let pong = engine
            .handle(&ctx, JsonRpcMessage::request(3, "ping", None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pong.result, Some(json!({})));

        let missing = engine
            .handle(&ctx, JsonRpcMessage::request(4, "tools/list", None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(missing.error.unwrap().code, codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let engine = BasicEngine::default();
        let reply = engine
            .handle(
                &ctx(),
                JsonRpcMessage::notification("notifications/initialized", None),
            )
            .await
            .unwrap();
        assert!(reply.is_none());
    }
}
