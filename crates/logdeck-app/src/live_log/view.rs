//! Output seams of a live log buffer.
//!
//! A buffer never prints or pops up anything itself. User-facing messages go
//! to a [`Notifier`] and page contents go to a [`LogView`], both injected at
//! construction.

use std::sync::Mutex;

use logdeck_core::LogLine;

use super::pager::PageInfo;

/// Sink for user-facing status messages
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Receives the visible page whenever it changes
pub trait LogView: Send + Sync {
    /// Called once per flush and once per page change
    fn page_updated(&self, lines: &[LogLine], info: PageInfo);

    /// Called after an update when auto-scroll is on; `index` is the last row of the page
    fn scroll_to_bottom(&self, _index: usize) {}
}

/// Severity of a recorded notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// [`Notifier`] that keeps every message, for tests and embedding
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.lock().clone()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.lock().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn last(&self) -> Option<(NoticeLevel, String)> {
        self.lock().last().cloned()
    }

    fn push(&self, level: NoticeLevel, message: &str) {
        self.lock().push((level, message.to_string()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(NoticeLevel, String)>> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.push(NoticeLevel::Success, message);
    }

    fn warning(&self, message: &str) {
        self.push(NoticeLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(NoticeLevel::Error, message);
    }
}

/// [`LogView`] that keeps the latest page and counts updates
#[derive(Debug, Default)]
pub struct RecordingView {
    inner: Mutex<RecordedPage>,
}

#[derive(Debug, Default, Clone)]
struct RecordedPage {
    lines: Vec<String>,
    info: Option<PageInfo>,
    updates: usize,
    scrolls: Vec<usize>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the most recently shown page
    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.clone()
    }

    pub fn info(&self) -> Option<PageInfo> {
        self.lock().info
    }

    pub fn update_count(&self) -> usize {
        self.lock().updates
    }

    pub fn scrolls(&self) -> Vec<usize> {
        self.lock().scrolls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordedPage> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LogView for RecordingView {
    fn page_updated(&self, lines: &[LogLine], info: PageInfo) {
        let mut page = self.lock();
        page.lines = lines.iter().map(|l| l.text.clone()).collect();
        page.info = Some(info);
        page.updates += 1;
    }

    fn scroll_to_bottom(&self, index: usize) {
        self.lock().scrolls.push(index);
    }
}
