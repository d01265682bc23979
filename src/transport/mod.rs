//! Session transport abstraction.
//!
//! A session is bound to exactly one transport handle. The handle is the only
//! path for server-to-client traffic: protocol replies on the legacy stream,
//! server pushes, and heartbeat probes all go through [`SessionTransport::send`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  send()   ┌──────────────────┐  subscribe()  ┌────────────┐
//! │ Session Manager  │──────────>│ ChannelTransport │──────────────>│ SSE stream │
//! │ Protocol Engine  │           │  (bounded queue) │               │ (GET/sse)  │
//! └──────────────────┘  close()  └──────────────────┘               └────────────┘
//! ```
//!
//! Messages sent while no stream is attached stay queued until one attaches
//! or the queue fills. After `close`, an attached stream drains what was
//! queued and then ends.

mod channel;

pub use channel::{ChannelTransport, OUTBOUND_CAPACITY};

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::error::{Result, TransportError};
use crate::protocol::JsonRpcMessage;

/// Server-to-client message stream handed to an HTTP response body.
pub type OutboundStream = BoxStream<'static, JsonRpcMessage>;

/// Opaque bound-transport handle owned by a session.
pub trait SessionTransport: Send + Sync {
    /// Queue a message for the client.
    fn send(&self, message: JsonRpcMessage) -> BoxFuture<'_, Result<()>>;

    /// Close the transport. Later sends fail.
    fn close(&self) -> BoxFuture<'_, Result<()>>;

    /// Resolves once the transport has been closed.
    fn closed(&self) -> BoxFuture<'static, ()>;

    /// Whether `close` has completed.
    fn is_closed(&self) -> bool;

    /// Attach the single outbound consumer.
    fn subscribe(&self) -> Result<OutboundStream> {
        Err(TransportError::Transport(
            "transport does not support streaming".to_string(),
        ))
    }

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;
}

/// Produces a fresh transport for a new session.
pub type TransportFactory = Arc<dyn Fn() -> Arc<dyn SessionTransport> + Send + Sync>;

/// Factory producing [`ChannelTransport`]s.
pub fn channel_factory() -> TransportFactory {
    Arc::new(|| Arc::new(ChannelTransport::new()) as Arc<dyn SessionTransport>)
}
