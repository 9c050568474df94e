//! # logdeck-client - Console API and Log Stream Transport
//!
//! Talks to the operations console backend: the REST API (login, service
//! registry, log files, live log control) and the WebSocket live log stream.
//!
//! Depends on [`logdeck_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### REST
//! - [`ConsoleApi`] - Blocking client for every console endpoint
//! - [`ServiceEntry`], [`LogFileEntry`] - Registry records
//!
//! ### Live Log Control
//! - [`ControlApi`] - Async start/stop seam used by live log buffers
//! - [`ConsoleControl`] - [`ControlApi`] over [`ConsoleApi`]
//!
//! ### Streaming
//! - [`StreamConnector`] - Async stream-opening seam
//! - [`WsConnector`] - WebSocket implementation
//! - [`StreamHandle`], [`StreamEvent`] - Owner side of an open stream
//!
//! ### Protocol
//! - [`decode_log_frame()`] - Decode one stream frame into line text
//! - [`stream_url()`] - Build the stream URL for a session

pub mod api;
pub mod control;
pub mod protocol;
pub mod stream;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use api::{ConsoleApi, DEFAULT_TIMEOUT};
pub use control::{ConsoleControl, ControlApi, ControlRequest, LocalControlApi};
pub use protocol::{
    decode_log_frame, parse_envelope, stream_url, ws_base_from_http, ApiEnvelope, LogFileEntry,
    ServiceEntry, ServiceRecord,
};
pub use stream::{
    LocalStreamConnector, StreamConnector, StreamEvent, StreamHandle, StreamRequest, WsConnector,
};
