//! Console wire protocol: REST response envelope, registry records, control
//! payloads, live log frames, and stream URL construction.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use logdeck_core::prelude::*;
use logdeck_core::{LogTarget, SessionKey};

/// Message used when the console gives no usable error text
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Envelope codes that mean the credential is missing or rejected
const LOGIN_REQUIRED_CODES: &[i64] = &[401, 403];

/// Characters escaped inside a single URL path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

// ─────────────────────────────────────────────────────────────────────────────
// Response envelope
// ─────────────────────────────────────────────────────────────────────────────

/// `{ code, message, data }` wrapper returned by every console endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    pub code: i64,

    #[serde(default, alias = "msg")]
    pub message: Option<String>,

    #[serde(default)]
    pub data: serde_json::Value,
}

impl ApiEnvelope {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Unwrap `data` on success, otherwise map the code to an [`Error`].
    ///
    /// 401/403 become [`Error::Unauthenticated`]. Other codes prefer a string
    /// `data` payload as the message, then `message`, then [`UNKNOWN_ERROR`].
    pub fn into_result(self) -> Result<serde_json::Value> {
        if self.is_success() {
            return Ok(self.data);
        }
        if LOGIN_REQUIRED_CODES.contains(&self.code) {
            return Err(Error::Unauthenticated);
        }
        let message = match self.data {
            serde_json::Value::String(s) if !s.is_empty() => s,
            _ => self
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        };
        Err(Error::api(self.code, message))
    }

    /// Unwrap and deserialize `data` into `T`
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        let data = self.into_result()?;
        Ok(serde_json::from_value(data)?)
    }
}

/// Parse a raw response body into an [`ApiEnvelope`]
pub fn parse_envelope(body: &str) -> Result<ApiEnvelope> {
    serde_json::from_str(body)
        .map_err(|e| Error::http(format!("unexpected response body: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry records
// ─────────────────────────────────────────────────────────────────────────────

/// A registered application endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    pub ip: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub port: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub path: Option<String>,

    #[serde(default)]
    pub status: Option<i64>,
}

impl ServiceEntry {
    /// Coordinates for one of this service's log files
    pub fn target(&self, log_name: impl Into<String>) -> LogTarget {
        let mut target = LogTarget::new(
            self.ip.clone(),
            self.port.clone().unwrap_or_default(),
            log_name,
        )
        .with_name(self.name.clone());
        target.path = self.path.clone();
        target
    }

    /// Editable fields of this entry, keyed by its id
    pub fn record(&self) -> ServiceRecord {
        ServiceRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            ip: self.ip.clone(),
            port: self.port.clone().unwrap_or_default(),
            path: self.path.clone(),
        }
    }
}

/// One log file exposed by a service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogFileEntry {
    #[serde(rename = "logName")]
    pub log_name: String,
}

/// Accept strings, numbers, and booleans as text; `null` becomes `None`
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Request payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `/auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of `/logs/addApp` and `/logs/updateApp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_id"
    )]
    pub id: Option<String>,
    pub name: String,
    pub ip: String,
    pub port: String,
    pub path: Option<String>,
}

/// Body of `/logs/delApp`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteServicesPayload {
    pub ids: Vec<serde_json::Value>,
}

impl DeleteServicesPayload {
    pub fn new(ids: &[String]) -> Self {
        Self {
            ids: ids.iter().map(String::as_str).map(id_value).collect(),
        }
    }
}

/// Registry ids go back numeric when they look numeric
fn id_value(id: &str) -> serde_json::Value {
    match id.parse::<i64>() {
        Ok(n) => serde_json::Value::from(n),
        Err(_) => serde_json::Value::from(id),
    }
}

fn serialize_optional_id<S>(
    id: &Option<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    id.as_deref().map(id_value).serialize(serializer)
}

/// Body of the log-list, log-url, and status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ServicePayload<'a> {
    pub name: &'a str,
    pub ip: &'a str,
    pub port: &'a str,
    pub path: Option<&'a str>,
    #[serde(rename = "logName")]
    pub log_name: Option<&'a str>,
}

impl<'a> ServicePayload<'a> {
    pub fn for_target(target: &'a LogTarget) -> Self {
        Self {
            name: &target.name,
            ip: &target.host,
            port: &target.port,
            path: target.path.as_deref(),
            log_name: if target.log_name.is_empty() {
                None
            } else {
                Some(&target.log_name)
            },
        }
    }
}

/// Body of `/logs/startIncrLog` and `/logs/closeIncrLog`.
///
/// Optional fields serialize as `null` rather than being omitted.
#[derive(Debug, Clone, Serialize)]
pub struct IncrementalLogPayload<'a> {
    pub name: &'a str,
    pub ip: &'a str,
    pub port: &'a str,
    pub path: Option<&'a str>,
    #[serde(rename = "logName")]
    pub log_name: &'a str,
    pub code: &'a str,
    pub search: Option<&'a str>,
}

impl<'a> IncrementalLogPayload<'a> {
    pub fn new(target: &'a LogTarget, key: &'a SessionKey, search: Option<&'a str>) -> Self {
        Self {
            name: &target.name,
            ip: &target.host,
            port: &target.port,
            path: target.path.as_deref(),
            log_name: &target.log_name,
            code: key.as_str(),
            search,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Live log frames
// ─────────────────────────────────────────────────────────────────────────────

/// A single frame pushed over the live log stream
#[derive(Debug, Clone, Deserialize)]
struct LogFrame {
    #[serde(rename = "logContent")]
    log_content: String,
}

/// Decode one stream frame into the text of a log line.
///
/// Frames must be JSON objects carrying a string `logContent`.
pub fn decode_log_frame(raw: &str) -> Result<String> {
    let frame: LogFrame = serde_json::from_str(raw).map_err(|e| Error::decode(e.to_string()))?;
    Ok(frame.log_content)
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream URL
// ─────────────────────────────────────────────────────────────────────────────

/// Build the WebSocket URL for a live log session:
/// `{ws_base}/websocket/logs/{ip}/{port}/{key}/{logName}?access_token={token}`
pub fn stream_url(
    ws_base: &Url,
    target: &LogTarget,
    key: &SessionKey,
    access_token: &str,
) -> Result<Url> {
    let segments = [
        target.host.as_str(),
        target.port.as_str(),
        key.as_str(),
        target.log_name.as_str(),
    ]
    .iter()
    .map(|s| utf8_percent_encode(s, PATH_SEGMENT).to_string())
    .collect::<Vec<_>>()
    .join("/");

    let base = ws_base.as_str().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/websocket/logs/{segments}"))
        .map_err(|e| Error::config(format!("invalid stream URL: {e}")))?;
    url.query_pairs_mut().append_pair("access_token", access_token);
    Ok(url)
}

/// Derive a WebSocket base from an HTTP base URL (`http` -> `ws`, `https` -> `wss`)
pub fn ws_base_from_http(base: &Url) -> Result<Url> {
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(Error::config(format!("unsupported URL scheme: {other}"))),
    };
    let rest = &base.as_str()[base.scheme().len()..];
    Url::parse(&format!("{scheme}{rest}"))
        .map_err(|e| Error::config(format!("invalid WebSocket base URL: {e}")))
}
