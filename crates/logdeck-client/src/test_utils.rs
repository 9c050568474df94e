//! Test doubles for the control and stream seams
//!
//! [`MockControl`] records every activation/deactivation and can be told to
//! reject activations. [`MockConnector`] hands out in-memory streams whose
//! events tests push by hand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::{mpsc, oneshot};

use logdeck_core::prelude::*;
use logdeck_core::SessionKey;

use crate::control::{ControlApi, ControlRequest};
use crate::stream::{StreamConnector, StreamEvent, StreamHandle, StreamRequest, STREAM_EVENT_CAPACITY};

// ─────────────────────────────────────────────────────────────────────────────
// MockControl
// ─────────────────────────────────────────────────────────────────────────────

/// Recording [`ControlApi`]
#[derive(Debug, Default)]
pub struct MockControl {
    activations: Mutex<Vec<ControlRequest>>,
    deactivations: Mutex<Vec<ControlRequest>>,
    reject_activation: AtomicBool,
}

impl MockControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// A control whose activations are all rejected
    pub fn rejecting() -> Self {
        let control = Self::default();
        control.set_reject_activation(true);
        control
    }

    pub fn set_reject_activation(&self, reject: bool) {
        self.reject_activation.store(reject, Ordering::SeqCst);
    }

    pub fn activations(&self) -> Vec<ControlRequest> {
        self.activations.lock().unwrap().clone()
    }

    pub fn deactivations(&self) -> Vec<ControlRequest> {
        self.deactivations.lock().unwrap().clone()
    }

    pub fn activation_count(&self) -> usize {
        self.activations.lock().unwrap().len()
    }

    pub fn deactivation_count(&self) -> usize {
        self.deactivations.lock().unwrap().len()
    }

    /// Session keys passed to activations, in call order
    pub fn activation_keys(&self) -> Vec<SessionKey> {
        self.activations()
            .into_iter()
            .map(|r| r.session_key)
            .collect()
    }
}

impl ControlApi for MockControl {
    async fn activate(&self, request: &ControlRequest) -> Result<()> {
        self.activations.lock().unwrap().push(request.clone());
        if self.reject_activation.load(Ordering::SeqCst) {
            return Err(Error::activation_failed("rejected by mock console"));
        }
        Ok(())
    }

    async fn deactivate(&self, request: &ControlRequest) -> Result<()> {
        self.deactivations.lock().unwrap().push(request.clone());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MockConnector
// ─────────────────────────────────────────────────────────────────────────────

/// One stream handed out by [`MockConnector`]
#[derive(Debug)]
struct MockStream {
    request: StreamRequest,
    event_tx: mpsc::Sender<StreamEvent>,
    close_rx: oneshot::Receiver<()>,
    closed: bool,
}

impl MockStream {
    /// Closed once the handle asked to close or was dropped
    fn is_open(&mut self) -> bool {
        if !self.closed {
            self.closed = !matches!(
                self.close_rx.try_recv(),
                Err(oneshot::error::TryRecvError::Empty)
            ) || self.event_tx.is_closed();
        }
        !self.closed
    }
}

/// In-memory [`StreamConnector`]
#[derive(Debug, Default)]
pub struct MockConnector {
    streams: Mutex<Vec<MockStream>>,
    refuse: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Number of successful connects so far
    pub fn connect_count(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    /// Number of streams whose handle is still open
    pub fn open_count(&self) -> usize {
        self.streams
            .lock()
            .unwrap()
            .iter_mut()
            .map(|s| s.is_open())
            .filter(|open| *open)
            .count()
    }

    /// Request of the most recent connect
    pub fn last_request(&self) -> Option<StreamRequest> {
        self.streams
            .lock()
            .unwrap()
            .last()
            .map(|s| s.request.clone())
    }

    /// Push an event into the most recent stream; false if there is none or it is gone
    pub async fn push(&self, event: StreamEvent) -> bool {
        let tx = self
            .streams
            .lock()
            .unwrap()
            .last()
            .map(|s| s.event_tx.clone());
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Push a well-formed log frame carrying `text`
    pub async fn push_line(&self, text: &str) -> bool {
        let frame = serde_json::json!({ "logContent": text }).to_string();
        self.push(StreamEvent::Text(frame)).await
    }
}

impl StreamConnector for MockConnector {
    async fn connect(&self, request: &StreamRequest) -> Result<StreamHandle> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Error::transport("connection refused by mock"));
        }
        let (event_tx, event_rx) = mpsc::channel(STREAM_EVENT_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();
        self.streams.lock().unwrap().push(MockStream {
            request: request.clone(),
            event_tx,
            close_rx,
            closed: false,
        });
        Ok(StreamHandle::new(event_rx, close_tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_core::{Credential, LogTarget};

    fn request() -> StreamRequest {
        StreamRequest {
            target: LogTarget::new("h", "1", "app.log"),
            session_key: SessionKey::from("k"),
            credential: Credential::new("t", "Bearer"),
        }
    }

    #[tokio::test]
    async fn test_mock_connector_tracks_open_streams() {
        let connector = MockConnector::new();
        let mut handle = connector.connect(&request()).await.unwrap();
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(connector.open_count(), 1);

        assert!(connector.push_line("hello").await);
        match handle.next_event().await {
            Some(StreamEvent::Text(raw)) => assert!(raw.contains("hello")),
            other => panic!("unexpected event: {other:?}"),
        }

        handle.close();
        assert_eq!(connector.open_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_control_records_and_rejects() {
        let control = MockControl::rejecting();
        let req = ControlRequest {
            target: LogTarget::new("h", "1", "app.log"),
            session_key: SessionKey::from("k"),
            search: None,
            credential: Credential::new("t", "Bearer"),
        };
        assert!(control.activate(&req).await.is_err());
        control.set_reject_activation(false);
        assert!(control.activate(&req).await.is_ok());
        control.deactivate(&req).await.unwrap();

        assert_eq!(control.activation_count(), 2);
        assert_eq!(control.deactivation_count(), 1);
        assert_eq!(control.activation_keys()[0].as_str(), "k");
    }
}
