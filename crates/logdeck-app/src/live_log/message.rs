//! Messages driving a [`LiveLogBuffer`](super::LiveLogBuffer).

use logdeck_client::StreamEvent;

/// Everything that can change a live log buffer after `start`
///
/// Attempt-scoped variants carry the generation of the attempt that produced
/// them; the buffer drops any whose generation is no longer current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveLogMessage {
    /// The console acknowledged activation
    Activated { generation: u64 },

    /// The console rejected activation or could not be reached
    ActivationFailed { generation: u64, error: String },

    /// The stream transport is connected
    StreamOpened { generation: u64 },

    /// The stream transport could not be opened
    ConnectFailed { generation: u64, error: String },

    /// An event from the open stream
    Stream { generation: u64, event: StreamEvent },

    /// The coalescing interval elapsed with lines pending
    FlushDue,
}

impl LiveLogMessage {
    /// Generation of the attempt that produced this message, if any
    pub fn generation(&self) -> Option<u64> {
        match self {
            LiveLogMessage::Activated { generation }
            | LiveLogMessage::ActivationFailed { generation, .. }
            | LiveLogMessage::StreamOpened { generation }
            | LiveLogMessage::ConnectFailed { generation, .. }
            | LiveLogMessage::Stream { generation, .. } => Some(*generation),
            LiveLogMessage::FlushDue => None,
        }
    }
}
