//! WebSocket implementation of [`StreamConnector`].
//!
//! ```text
//!  StreamHandle                     background task
//!  ┌──────────────┐  events chan   ┌──────────────────────────┐
//!  │ next_event() ◀┼───────────────┤ ws read loop             │
//!  │              │                │  Text   -> Text(String)  │
//!  │ close()  ────┼──oneshot──────▶│  Close  -> Closed        │
//!  └──────────────┘                │  Err    -> Error(msg)    │
//!                                  └──────────────────────────┘
//! ```

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use logdeck_core::prelude::*;

use super::{StreamConnector, StreamEvent, StreamHandle, StreamRequest, STREAM_EVENT_CAPACITY};
use crate::protocol::stream_url;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Opens live log streams over WebSocket
#[derive(Debug, Clone)]
pub struct WsConnector {
    ws_base: Url,
}

impl WsConnector {
    pub fn new(ws_base: Url) -> Self {
        Self { ws_base }
    }

    pub fn ws_base(&self) -> &Url {
        &self.ws_base
    }
}

impl StreamConnector for WsConnector {
    async fn connect(&self, request: &StreamRequest) -> Result<StreamHandle> {
        let url = stream_url(
            &self.ws_base,
            &request.target,
            &request.session_key,
            &request.credential.access_token,
        )?;
        info!(
            "Opening log stream for {} (session {})",
            request.target.label(),
            request.session_key
        );

        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::transport(format!("failed to connect log stream: {e}")))?;

        let (event_tx, event_rx) = mpsc::channel(STREAM_EVENT_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(run_stream_task(ws_stream, event_tx, close_rx));

        Ok(StreamHandle::new(event_rx, close_tx))
    }
}

/// Forward frames until the remote closes, the read fails, or the handle
/// asks to close.
async fn run_stream_task(
    ws_stream: WsStream,
    event_tx: mpsc::Sender<StreamEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    loop {
        tokio::select! {
            biased;

            // Either an explicit close or the handle being dropped
            _ = &mut close_rx => {
                debug!("Log stream: close requested");
                send_close(&mut ws_sink).await;
                break;
            }

            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let event = StreamEvent::Text(text.as_str().to_owned());
                        if event_tx.send(event).await.is_err() {
                            debug!("Log stream: event receiver gone, closing");
                            send_close(&mut ws_sink).await;
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!("Log stream: closed by remote");
                        let _ = event_tx.send(StreamEvent::Closed).await;
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/Binary — ignore
                    }
                    Some(Err(err)) => {
                        warn!("Log stream: read error: {}", err);
                        let _ = event_tx.send(StreamEvent::Error(err.to_string())).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("Log stream task exiting");
}

/// Send a WebSocket Close frame, ignoring any write errors.
async fn send_close(ws_sink: &mut SplitSink<WsStream, WsMessage>) {
    let _ = ws_sink.send(WsMessage::Close(None)).await;
    let _ = ws_sink.close().await;
}
