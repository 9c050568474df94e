//! Live log streaming for a single remote log target
//!
//! - [`LiveLogBuffer`] - session lifecycle, coalescing, and paging
//! - [`LineBatcher`] - time-bounded coalescing of incoming lines
//! - [`PageWindow`] - newest-first page arithmetic
//! - [`ConnectionSession`] - session key, filter, and connection state
//! - [`Notifier`], [`LogView`] - injected output seams

pub mod batcher;
pub mod buffer;
pub mod message;
pub mod pager;
pub mod session;
pub mod view;

#[cfg(test)]
mod tests;

pub use batcher::LineBatcher;
pub use buffer::{LiveLogBuffer, LiveLogDeps};
pub use message::LiveLogMessage;
pub use pager::{PageInfo, PageWindow};
pub use session::ConnectionSession;
pub use view::{LogView, NoticeLevel, Notifier, RecordingNotifier, RecordingView};
