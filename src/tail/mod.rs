//! Tail mode - live log paging on the terminal
//!
//! Streams one remote log file through a [`LiveLogBuffer`] and prints the
//! current page every time it changes. Commands are read line by line from
//! stdin:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `search <text>` | Restart with a server-side filter (`search` alone clears it) |
//! | `start` / `stop` | Reconnect / disconnect |
//! | `page <n>`, `next`, `prev` | Page through history (page 1 is newest) |
//! | `scroll on` / `scroll off` | Toggle auto-scroll |
//! | `quit` | Stop and exit |
//!
//! With `--json`, pages, notices, and state changes are written to stdout as
//! NDJSON instead:
//!
//! ```json
//! {"event":"state","state":"open","timestamp":1704700001000}
//! {"event":"page","page":1,"page_count":3,"total_lines":45,"lines":["..."],"timestamp":1704700002000}
//! ```
//!
//! [`LiveLogBuffer`]: logdeck_app::LiveLogBuffer

pub mod runner;

use std::io::{self, Write};

use chrono::Utc;
use serde::Serialize;
use tracing::error;

use logdeck_app::live_log::{LogView, Notifier, PageInfo};
use logdeck_core::{ConnectionState, LogLine};

pub use runner::{run_tail, tail_loop, TailOptions};

/// How tail output is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

/// Events emitted in `--json` mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TailEvent {
    /// The visible page changed
    Page {
        page: usize,
        page_count: usize,
        total_lines: usize,
        lines: Vec<String>,
        timestamp: i64,
    },

    /// Auto-scroll moved to this row of the page
    Scroll { index: usize, timestamp: i64 },

    /// User-facing status message
    Notice {
        level: String,
        message: String,
        timestamp: i64,
    },

    /// Connection state changed
    State { state: String, timestamp: i64 },
}

impl TailEvent {
    /// Write this event to stdout as one JSON line
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize tail event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write tail event to stdout: {}", e);
            return;
        }
        if let Err(e) = stdout.flush() {
            error!("Failed to flush stdout: {}", e);
        }
    }

    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn page(lines: &[LogLine], info: PageInfo) -> Self {
        Self::Page {
            page: info.page,
            page_count: info.page_count,
            total_lines: info.total_lines,
            lines: lines.iter().map(|l| l.text.clone()).collect(),
            timestamp: Self::now(),
        }
    }

    pub fn scroll(index: usize) -> Self {
        Self::Scroll {
            index,
            timestamp: Self::now(),
        }
    }

    pub fn notice(level: &str, message: &str) -> Self {
        Self::Notice {
            level: level.to_string(),
            message: message.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn state(state: ConnectionState) -> Self {
        Self::State {
            state: state.to_string(),
            timestamp: Self::now(),
        }
    }
}

/// [`LogView`] printing each page to stdout
#[derive(Debug)]
pub struct StdoutView {
    label: String,
    mode: OutputMode,
}

impl StdoutView {
    pub fn new(label: impl Into<String>, mode: OutputMode) -> Self {
        Self {
            label: label.into(),
            mode,
        }
    }
}

impl LogView for StdoutView {
    fn page_updated(&self, lines: &[LogLine], info: PageInfo) {
        if self.mode == OutputMode::Json {
            TailEvent::page(lines, info).emit();
            return;
        }

        let mut stdout = io::stdout().lock();
        let _ = writeln!(
            stdout,
            "── {} · page {}/{} · {} lines ──",
            self.label,
            info.page,
            info.page_count.max(1),
            info.total_lines
        );
        for line in lines {
            let _ = writeln!(stdout, "{}", line.text);
        }
        let _ = stdout.flush();
    }

    fn scroll_to_bottom(&self, index: usize) {
        if self.mode == OutputMode::Json {
            TailEvent::scroll(index).emit();
        }
    }
}

/// [`Notifier`] writing to stderr, or to the NDJSON stream in `--json` mode
#[derive(Debug)]
pub struct ConsoleNotifier {
    mode: OutputMode,
}

impl ConsoleNotifier {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    fn show(&self, level: &str, marker: &str, message: &str) {
        match self.mode {
            OutputMode::Json => TailEvent::notice(level, message).emit(),
            OutputMode::Text => eprintln!("{marker} {message}"),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        tracing::info!("{}", message);
        self.show("success", "✅", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
        self.show("warning", "⚠️", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
        self.show("error", "❌", message);
    }
}

/// One line of stdin input in tail mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailCommand {
    Search(String),
    Start,
    Stop,
    Page(usize),
    Next,
    Prev,
    AutoScroll(bool),
    Quit,
}

/// Parse a command line; `None` for blank or unknown input
pub fn parse_command(line: &str) -> Option<TailCommand> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "search" | "/" => Some(TailCommand::Search(rest.to_string())),
        "start" => Some(TailCommand::Start),
        "stop" => Some(TailCommand::Stop),
        "page" => rest.parse().ok().map(TailCommand::Page),
        "next" | "n" => Some(TailCommand::Next),
        "prev" => Some(TailCommand::Prev),
        "scroll" => match rest {
            "on" => Some(TailCommand::AutoScroll(true)),
            "off" => Some(TailCommand::AutoScroll(false)),
            _ => None,
        },
        "q" | "quit" => Some(TailCommand::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("search ERROR timeout"),
            Some(TailCommand::Search("ERROR timeout".to_string()))
        );
        assert_eq!(
            parse_command("search"),
            Some(TailCommand::Search(String::new()))
        );
        assert_eq!(parse_command("  start "), Some(TailCommand::Start));
        assert_eq!(parse_command("stop"), Some(TailCommand::Stop));
        assert_eq!(parse_command("page 3"), Some(TailCommand::Page(3)));
        assert_eq!(parse_command("next"), Some(TailCommand::Next));
        assert_eq!(parse_command("prev"), Some(TailCommand::Prev));
        assert_eq!(
            parse_command("scroll on"),
            Some(TailCommand::AutoScroll(true))
        );
        assert_eq!(parse_command("q"), Some(TailCommand::Quit));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("page"), None);
        assert_eq!(parse_command("page x"), None);
        assert_eq!(parse_command("scroll maybe"), None);
        assert_eq!(parse_command("reload"), None);
    }

    #[test]
    fn test_page_event_serialization() {
        let lines = vec![LogLine::new("a"), LogLine::new("b")];
        let info = PageInfo {
            page: 1,
            page_count: 1,
            total_lines: 2,
        };
        let json = serde_json::to_value(TailEvent::page(&lines, info)).unwrap();
        assert_eq!(json["event"], "page");
        assert_eq!(json["total_lines"], 2);
        assert_eq!(json["lines"][1], "b");
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_state_event_serialization() {
        let json = serde_json::to_value(TailEvent::state(ConnectionState::Open)).unwrap();
        assert_eq!(json["event"], "state");
        assert_eq!(json["state"], "open");

        let json = serde_json::to_value(TailEvent::notice("error", "boom")).unwrap();
        assert_eq!(json["event"], "notice");
        assert_eq!(json["level"], "error");
    }
}
