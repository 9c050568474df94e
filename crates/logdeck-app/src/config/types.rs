//! Configuration types for logdeck
//!
//! Defines:
//! - `Settings` - Global application settings (`config.toml`)
//! - `ServerSettings` - Console endpoints
//! - `LiveLogSettings` - Live log paging and coalescing

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use logdeck_client::ws_base_from_http;
use logdeck_core::prelude::*;

/// Lines per page of the live log view
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Minimum time between two coalesced flushes of incoming lines
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 500;

/// Application settings (`config.toml`)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub live_log: LiveLogSettings,
}

/// Console endpoint settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Base URL of the REST API, including any path prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the WebSocket endpoint; derived from `base_url` when unset
    #[serde(default)]
    pub ws_base_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerSettings {
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("invalid server.base_url '{}': {e}", self.base_url)))
    }

    pub fn ws_base_url(&self) -> Result<Url> {
        match &self.ws_base_url {
            Some(raw) => Url::parse(raw)
                .map_err(|e| Error::config(format!("invalid server.ws_base_url '{raw}': {e}"))),
            None => ws_base_from_http(&self.base_url()?),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Live log view settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LiveLogSettings {
    /// Lines per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Minimum milliseconds between flushes of incoming lines into the view
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Scroll to the bottom of the page after every update
    #[serde(default)]
    pub auto_scroll: bool,

    /// Retain at most this many lines, evicting the oldest; unbounded when unset
    #[serde(default)]
    pub max_lines: Option<usize>,
}

impl Default for LiveLogSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            flush_interval_ms: default_flush_interval_ms(),
            auto_scroll: false,
            max_lines: None,
        }
    }
}

impl LiveLogSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}
