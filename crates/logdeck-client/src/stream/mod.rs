//! Live log stream transport.
//!
//! A [`StreamConnector`] opens one stream for a session and hands back a
//! [`StreamHandle`]. The handle yields [`StreamEvent`]s in arrival order and
//! closes the underlying connection on [`StreamHandle::close`] or drop.

pub mod ws;

use tokio::sync::{mpsc, oneshot};

use logdeck_core::prelude::*;
use logdeck_core::{Credential, LogTarget, SessionKey};

pub use ws::WsConnector;

/// Capacity of the per-stream event channel
pub const STREAM_EVENT_CAPACITY: usize = 256;

/// Something that happened on an open stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text frame, still undecoded
    Text(String),
    /// The stream failed; no further events follow
    Error(String),
    /// The remote side closed the stream; no further events follow
    Closed,
}

impl StreamEvent {
    /// True for events after which the stream is gone
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::Closed)
    }
}

/// Coordinates of one stream connection
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub target: LogTarget,
    pub session_key: SessionKey,
    pub credential: Credential,
}

/// Owner side of an open stream
#[derive(Debug)]
pub struct StreamHandle {
    events: mpsc::Receiver<StreamEvent>,
    close_tx: Option<oneshot::Sender<()>>,
}

impl StreamHandle {
    /// Wrap an event receiver and the close signal of the task feeding it
    pub fn new(events: mpsc::Receiver<StreamEvent>, close_tx: oneshot::Sender<()>) -> Self {
        Self {
            events,
            close_tx: Some(close_tx),
        }
    }

    /// Next event, or `None` once the feeding task is gone
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Ask the feeding task to close the connection. Idempotent.
    pub fn close(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.close_tx.is_none()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens live log streams
#[trait_variant::make(StreamConnector: Send)]
pub trait LocalStreamConnector {
    /// Connect and return a handle once the stream is established
    async fn connect(&self, request: &StreamRequest) -> Result<StreamHandle>;
}
