//! Blocking HTTP client for the console REST API.
//!
//! Every endpoint is a `POST` with a JSON body answered by an
//! [`ApiEnvelope`]. Authenticated calls carry `Authorization: {type} {token}`.
//! The client is blocking; async callers go through
//! [`ConsoleControl`](crate::control::ConsoleControl) which moves calls onto
//! the blocking thread pool.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use url::Url;

use logdeck_core::prelude::*;
use logdeck_core::{Credential, LogTarget, SessionKey};

use crate::protocol::{
    parse_envelope, ApiEnvelope, DeleteServicesPayload, IncrementalLogPayload, LogFileEntry,
    LoginPayload, ServiceEntry, ServicePayload, ServiceRecord,
};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// File name used when a download URL has no usable last segment
const FALLBACK_DOWNLOAD_NAME: &str = "download.log";

pub mod endpoints {
    pub const LOGIN: &str = "/auth/login";
    pub const APP_LIST: &str = "/logs/getAppList";
    pub const ADD_APP: &str = "/logs/addApp";
    pub const UPDATE_APP: &str = "/logs/updateApp";
    pub const DELETE_APP: &str = "/logs/delApp";
    pub const APP_STATUS: &str = "/logs/getStatus";
    pub const LOG_LIST: &str = "/logs/getLogList";
    pub const LOG_URL: &str = "/logs/getLogUrl";
    pub const START_INCR_LOG: &str = "/logs/startIncrLog";
    pub const CLOSE_INCR_LOG: &str = "/logs/closeIncrLog";
}

/// Client for the console REST API
pub struct ConsoleApi {
    agent: ureq::Agent,
    base_url: Url,
}

impl fmt::Debug for ConsoleApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleApi")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl ConsoleApi {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// POST `body` to `path` and return the parsed envelope.
    ///
    /// `credential` is required for every endpoint except login; a credential
    /// without a usable `Authorization` value is rejected before any I/O.
    fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        credential: Option<&Credential>,
    ) -> Result<ApiEnvelope> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let mut request = self.agent.post(&url);
        if let Some(credential) = credential {
            let header = credential
                .authorization_header()
                .ok_or(Error::InvalidCredential)?;
            request = request.header("Authorization", &header);
        }

        let mut response = request
            .send_json(body)
            .map_err(|e| Error::http(format!("{path}: {e}")))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::http(format!("{path}: failed to read body: {e}")))?;

        match status {
            401 | 403 => Err(Error::Unauthenticated),
            500 => Err(Error::http(format!("{path}: server error (HTTP 500)"))),
            200..=299 => parse_envelope(&text),
            _ => parse_envelope(&text)
                .map_err(|_| Error::http(format!("{path}: unexpected HTTP status {status}"))),
        }
    }

    /// Exchange a username and password for an access credential
    pub fn login(&self, username: &str, password: &str) -> Result<Credential> {
        let payload = LoginPayload { username, password };
        self.post(endpoints::LOGIN, &payload, None)?.into_data()
    }

    /// List registered services
    pub fn app_list(&self, credential: &Credential) -> Result<Vec<ServiceEntry>> {
        let envelope = self.post(endpoints::APP_LIST, &serde_json::json!({}), Some(credential))?;
        let data = envelope.into_result()?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(data)?)
    }

    /// Register a new service
    pub fn add_app(&self, service: &ServiceRecord, credential: &Credential) -> Result<()> {
        self.post(endpoints::ADD_APP, service, Some(credential))?
            .into_result()?;
        Ok(())
    }

    /// Replace a registered service; `service.id` selects the record
    pub fn update_app(&self, service: &ServiceRecord, credential: &Credential) -> Result<()> {
        if service.id.is_none() {
            return Err(Error::config("updating a service requires its id"));
        }
        self.post(endpoints::UPDATE_APP, service, Some(credential))?
            .into_result()?;
        Ok(())
    }

    /// Remove registered services by id
    pub fn delete_apps(&self, ids: &[String], credential: &Credential) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let payload = DeleteServicesPayload::new(ids);
        self.post(endpoints::DELETE_APP, &payload, Some(credential))?
            .into_result()?;
        Ok(())
    }

    /// Probe whether the console can reach a service
    pub fn app_status(&self, target: &LogTarget, credential: &Credential) -> Result<bool> {
        let payload = ServicePayload::for_target(target);
        let data = self
            .post(endpoints::APP_STATUS, &payload, Some(credential))?
            .into_result()?;
        Ok(is_truthy(&data))
    }

    /// List log files of a service; a non-empty `target.log_name` filters by name
    pub fn log_list(&self, target: &LogTarget, credential: &Credential) -> Result<Vec<LogFileEntry>> {
        let payload = ServicePayload::for_target(target);
        let data = self
            .post(endpoints::LOG_LIST, &payload, Some(credential))?
            .into_result()?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(data)?)
    }

    /// Resolve the download URL of a full log file
    pub fn log_url(&self, target: &LogTarget, credential: &Credential) -> Result<String> {
        let payload = ServicePayload::for_target(target);
        self.post(endpoints::LOG_URL, &payload, Some(credential))?
            .into_data()
    }

    /// Arm the server-side emitter for a live log session.
    ///
    /// Returns whether the console acknowledged the activation.
    pub fn start_incremental_log(
        &self,
        target: &LogTarget,
        key: &SessionKey,
        search: Option<&str>,
        credential: &Credential,
    ) -> Result<bool> {
        let payload = IncrementalLogPayload::new(target, key, search);
        let data = self
            .post(endpoints::START_INCR_LOG, &payload, Some(credential))?
            .into_result()?;
        Ok(is_truthy(&data))
    }

    /// Disarm the server-side emitter for a live log session
    pub fn close_incremental_log(
        &self,
        target: &LogTarget,
        key: &SessionKey,
        credential: &Credential,
    ) -> Result<()> {
        let payload = IncrementalLogPayload::new(target, key, None);
        self.post(endpoints::CLOSE_INCR_LOG, &payload, Some(credential))?
            .into_result()?;
        Ok(())
    }

    /// Download a full log file into `dir`, named after the URL's last path segment
    pub fn download(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        let file_name = download_file_name(url);
        let dest = dir.join(file_name);
        info!("Downloading {} to {}", url, dest.display());

        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| Error::http(format!("download failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!(
                "download failed: log status {}",
                status.as_u16()
            )));
        }

        let mut reader = response.into_body().into_reader();
        let mut file = File::create(&dest)?;
        std::io::copy(&mut reader, &mut file)?;
        Ok(dest)
    }
}

/// Loose truthiness of a JSON `data` payload
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

/// Last path segment of `url`, without query or fragment
fn download_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_DOWNLOAD_NAME.to_string())
}
