//! Protocol envelope and engine contract.
//!
//! The transport layer treats protocol processing as an opaque capability:
//! a [`ProtocolEngine`] accepts a message for a session and may produce a
//! reply. Only the JSON-RPC 2.0 envelope is understood here, enough to route
//! requests and to recognize the session-opening `initialize` call.
//!
//! # Message Kinds
//!
//! | Kind         | Members            | Streamable POST reply |
//! |--------------|--------------------|-----------------------|
//! | Request      | `method` + `id`    | 200 + JSON result     |
//! | Notification | `method`, no `id`  | 202, empty            |
//! | Response     | `result`/`error`   | 202, empty            |
//!
//! # Protocol Versions
//!
//! Clients may announce their revision in the `Mcp-Protocol-Version` header;
//! only [`SUPPORTED_PROTOCOL_VERSIONS`] are admitted by the filter chain.

mod engine;
mod message;

pub use engine::{BasicEngine, EngineContext, ProtocolEngine};
pub use message::{
    codes, JsonRpcError, JsonRpcMessage, MessageKind, HEARTBEAT_ID_PREFIX, INITIALIZE_METHOD,
    JSONRPC_VERSION, PING_METHOD,
};

/// Protocol revisions accepted from clients, oldest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Revision offered when the client asks for an unknown one
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";
