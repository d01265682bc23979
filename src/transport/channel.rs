//! Channel-backed session transport.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::{OutboundStream, SessionTransport};
use crate::error::{Result, TransportError};
use crate::protocol::JsonRpcMessage;

/// Outbound queue depth per session
pub const OUTBOUND_CAPACITY: usize = 64;

type ReceiverSlot = Arc<Mutex<Option<mpsc::Receiver<JsonRpcMessage>>>>;

/// Transport whose outbound side is a bounded mpsc queue.
///
/// The receiver lives in a slot; [`SessionTransport::subscribe`] takes it and
/// the returned stream puts it back when dropped, so a client can reconnect
/// its notification stream without losing queued messages.
pub struct ChannelTransport {
    sender: Mutex<Option<mpsc::Sender<JsonRpcMessage>>>,
    receiver: ReceiverSlot,
    closed: CancellationToken,
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelTransport {
    /// Create a transport with the default queue depth
    pub fn new() -> Self {
        Self::with_capacity(OUTBOUND_CAPACITY)
    }

    /// Create a transport with a custom queue depth
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Arc::new(Mutex::new(Some(rx))),
            closed: CancellationToken::new(),
        }
    }

    fn try_send(&self, message: JsonRpcMessage) -> Result<()> {
        let guard = self
            .sender
            .lock()
            .map_err(|_| TransportError::Transport("sender lock poisoned".to_string()))?;
        let Some(sender) = guard.as_ref() else {
            return Err(TransportError::Transport("transport closed".to_string()));
        };

        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::QueueFull,
            TrySendError::Closed(_) => TransportError::Transport("transport closed".to_string()),
        })
    }
}

impl SessionTransport for ChannelTransport {
    fn send(&self, message: JsonRpcMessage) -> BoxFuture<'_, Result<()>> {
        let result = self.try_send(message);
        Box::pin(async move { result })
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            // Dropping the sender lets an attached stream drain and end
            let sender = self
                .sender
                .lock()
                .map_err(|_| TransportError::Transport("sender lock poisoned".to_string()))?
                .take();
            drop(sender);
            self.closed.cancel();
            Ok(())
        })
    }

    fn closed(&self) -> BoxFuture<'static, ()> {
        let token = self.closed.clone();
        Box::pin(async move { token.cancelled().await })
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn subscribe(&self) -> Result<OutboundStream> {
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| TransportError::Transport("receiver lock poisoned".to_string()))?
            .take()
            .ok_or(TransportError::StreamConflict)?;

        Ok(Box::pin(ReceiverStream {
            receiver: Some(receiver),
            slot: Arc::clone(&self.receiver),
        }))
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

/// Stream over the outbound queue that returns the receiver on drop.
struct ReceiverStream {
    receiver: Option<mpsc::Receiver<JsonRpcMessage>>,
    slot: ReceiverSlot,
}

impl Stream for ReceiverStream {
    type Item = JsonRpcMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().receiver.as_mut() {
            Some(rx) => rx.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for ReceiverStream {
    fn drop(&mut self) {
        if let Some(rx) = self.receiver.take() {
            if let Ok(mut slot) = self.slot.lock() {
                *slot = Some(rx);
            }
        }
    }
}
