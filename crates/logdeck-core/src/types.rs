//! Domain types shared by every logdeck crate

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// LogLine
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for a log line
pub type LogLineId = u64;

static LOG_LINE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique log line ID
pub fn next_log_line_id() -> LogLineId {
    LOG_LINE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A single decoded line of a live log stream.
///
/// Lines are immutable once created; `id` is unique for the lifetime of the
/// process and is what display layers key rows on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub id: LogLineId,
    pub text: String,
}

impl LogLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: next_log_line_id(),
            text: text.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LogTarget
// ─────────────────────────────────────────────────────────────────────────────

/// Coordinates of a remote log source.
///
/// Field names on the wire follow the console's REST contract
/// (`ip`, `port`, `path`, `logName`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTarget {
    /// Display name of the registered service
    #[serde(default)]
    pub name: String,

    /// Host the service runs on
    #[serde(rename = "ip")]
    pub host: String,

    /// Service port, kept as text because the registry stores it that way
    pub port: String,

    /// Deployment path of the service on the host
    #[serde(default)]
    pub path: Option<String>,

    /// Log file name within the service
    #[serde(rename = "logName")]
    pub log_name: String,
}

impl LogTarget {
    pub fn new(host: impl Into<String>, port: impl Into<String>, log_name: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            host: host.into(),
            port: port.into(),
            path: None,
            log_name: log_name.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Human readable label, e.g. `orders 10.0.0.5:8080 app.log`
    pub fn label(&self) -> String {
        let base = format!("{}:{} {}", self.host, self.port, self.log_name);
        if self.name.is_empty() {
            base
        } else {
            format!("{} {}", self.name, base)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionKey
// ─────────────────────────────────────────────────────────────────────────────

/// Length of a minted session key
pub const SESSION_KEY_LEN: usize = 32;

/// Correlation token shared by the activation call, the stream URL, and the
/// deactivation call of one live log session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Mint a fresh random key
    pub fn generate() -> Self {
        let key: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_KEY_LEN)
            .map(char::from)
            .collect();
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credential
// ─────────────────────────────────────────────────────────────────────────────

/// Access credential returned by the console login endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,

    #[serde(default)]
    pub token_type: String,

    #[serde(default)]
    pub expires_in: Option<String>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in: None,
        }
    }

    /// A credential is usable only when it carries a token
    pub fn is_present(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Value for the HTTP `Authorization` header, `None` when either part is missing
    pub fn authorization_header(&self) -> Option<String> {
        if self.access_token.is_empty() || self.token_type.is_empty() {
            return None;
        }
        Some(format!("{} {}", self.token_type, self.access_token))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ConnectionState
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a live log connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session has been started, or activation was rejected
    #[default]
    Idle,
    /// Activation request or transport connect in flight
    Connecting,
    /// Transport connected, lines flowing
    Open,
    /// Transport closed by stop, teardown, error, or the remote side
    Closed,
}

impl ConnectionState {
    /// True while a transport is being established or is open
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}
