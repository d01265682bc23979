//! JSON-RPC 2.0 envelope.
//!
//! The transport never interprets method semantics. It only needs to tell
//! initialize requests, other requests, notifications and responses apart,
//! and to build the heartbeat `ping` probe.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TransportError};

/// JSON-RPC version string
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name of the session-opening request
pub const INITIALIZE_METHOD: &str = "initialize";

/// Method name of the liveness probe
pub const PING_METHOD: &str = "ping";

/// Id prefix used for server-originated heartbeat probes
pub const HEARTBEAT_ID_PREFIX: &str = "hb-";

/// Standard JSON-RPC error codes
pub mod codes {
    /// Invalid JSON
    pub const PARSE_ERROR: i64 = -32700;
    /// Not a valid request object
    pub const INVALID_REQUEST: i64 = -32600;
    /// Method does not exist
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,
    /// Short description
    pub message: String,
    /// Additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC message (request, notification or response)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcMessage {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Request/response id (absent for notifications)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name (requests and notifications)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Successful result (responses)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (responses)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Kind of message, derived from which members are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Has `method` and `id`
    Request,
    /// Has `method`, no `id`
    Notification,
    /// Has `result` or `error`, no `method`
    Response,
}

impl JsonRpcMessage {
    /// Parse and shape-check a single message from a request body.
    ///
    /// Batches (JSON arrays) are rejected.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| TransportError::Validation(format!("invalid JSON: {e}")))?;

        match value {
            Value::Object(_) => {},
            Value::Array(_) => {
                return Err(TransportError::Validation(
                    "batch messages are not supported".to_string(),
                ))
            },
            _ => {
                return Err(TransportError::Validation(
                    "message must be a JSON object".to_string(),
                ))
            },
        }

        let message: Self = serde_json::from_value(value)
            .map_err(|e| TransportError::Validation(format!("not a JSON-RPC message: {e}")))?;

        if message.jsonrpc != JSONRPC_VERSION {
            return Err(TransportError::Validation(format!(
                "unsupported jsonrpc version: {}",
                message.jsonrpc
            )));
        }
        if message.method.is_none() && message.result.is_none() && message.error.is_none() {
            return Err(TransportError::Validation(
                "message has neither method nor result/error".to_string(),
            ));
        }
        if message.method.is_none() && message.id.is_none() {
            return Err(TransportError::Validation(
                "response is missing its id".to_string(),
            ));
        }

        Ok(message)
    }

    /// Create a request
    pub fn request(id: impl Into<Value>, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: Some(method.to_string()),
            params,
            result: None,
            error: None,
        }
    }

    /// Create a notification
    pub fn notification(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: Some(method.to_string()),
            params,
            result: None,
            error: None,
        }
    }

    /// Create a successful response
    pub fn result(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i64, message: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: None,
            params: None,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
                data: None,
            }),
        }
    }

    /// Create a heartbeat probe with sequence number `seq`
    pub fn ping(seq: u64) -> Self {
        Self::request(format!("{HEARTBEAT_ID_PREFIX}{seq}"), PING_METHOD, None)
    }

    /// Classify the message
    pub fn kind(&self) -> MessageKind {
        match (&self.method, &self.id) {
            (Some(_), Some(_)) => MessageKind::Request,
            (Some(_), None) => MessageKind::Notification,
            (None, _) => MessageKind::Response,
        }
    }

    /// Is this a request expecting a response
    pub fn is_request(&self) -> bool {
        self.kind() == MessageKind::Request
    }

    /// Is this a notification
    pub fn is_notification(&self) -> bool {
        self.kind() == MessageKind::Notification
    }

    /// Is this a response
    pub fn is_response(&self) -> bool {
        self.kind() == MessageKind::Response
    }

    /// Is this the session-opening `initialize` request
    pub fn is_initialize(&self) -> bool {
        self.is_request() && self.method.as_deref() == Some(INITIALIZE_METHOD)
    }

    /// Is this a client reply to a server heartbeat probe
    pub fn is_heartbeat_reply(&self) -> bool {
        self.is_response()
            && self
                .id
                .as_ref()
                .and_then(Value::as_str)
                .is_some_and(|id| id.starts_with(HEARTBEAT_ID_PREFIX))
    }
}
