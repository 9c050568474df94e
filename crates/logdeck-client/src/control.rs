//! Activation control calls for live log sessions.
//!
//! [`ControlApi`] is the seam between a live log buffer and the console's
//! start/stop endpoints. [`ConsoleControl`] is the production implementation
//! over [`ConsoleApi`]; tests substitute the mock in `test_utils`.

use std::sync::Arc;

use logdeck_core::prelude::*;
use logdeck_core::{Credential, LogTarget, SessionKey};

use crate::api::ConsoleApi;

/// Everything a control call needs to identify one live log session
#[derive(Debug, Clone)]
pub struct ControlRequest {
    pub target: LogTarget,
    pub session_key: SessionKey,
    /// Server-side line filter; `None` streams everything
    pub search: Option<String>,
    pub credential: Credential,
}

/// Start/stop of the server-side log emitter.
///
/// `activate` must fail when the console does not acknowledge the request;
/// callers never open a transport after a failed activation.
#[trait_variant::make(ControlApi: Send)]
pub trait LocalControlApi {
    /// Arm the emitter for `request.session_key`
    async fn activate(&self, request: &ControlRequest) -> Result<()>;

    /// Disarm the emitter for `request.session_key`
    async fn deactivate(&self, request: &ControlRequest) -> Result<()>;
}

/// [`ControlApi`] backed by the console REST endpoints
#[derive(Debug, Clone)]
pub struct ConsoleControl {
    api: Arc<ConsoleApi>,
}

impl ConsoleControl {
    pub fn new(api: Arc<ConsoleApi>) -> Self {
        Self { api }
    }
}

impl ControlApi for ConsoleControl {
    async fn activate(&self, request: &ControlRequest) -> Result<()> {
        let api = Arc::clone(&self.api);
        let request = request.clone();
        let acked = tokio::task::spawn_blocking(move || {
            api.start_incremental_log(
                &request.target,
                &request.session_key,
                request.search.as_deref(),
                &request.credential,
            )
        })
        .await
        .map_err(|e| Error::activation_failed(format!("activation task failed: {e}")))?
        .map_err(|e| match e {
            Error::Unauthenticated => Error::Unauthenticated,
            Error::InvalidCredential => Error::InvalidCredential,
            other => Error::activation_failed(other.to_string()),
        })?;

        if !acked {
            return Err(Error::activation_failed(
                "console did not acknowledge the live log request",
            ));
        }
        Ok(())
    }

    async fn deactivate(&self, request: &ControlRequest) -> Result<()> {
        let api = Arc::clone(&self.api);
        let request = request.clone();
        tokio::task::spawn_blocking(move || {
            api.close_incremental_log(&request.target, &request.session_key, &request.credential)
        })
        .await
        .map_err(|e| Error::http(format!("deactivation task failed: {e}")))?
    }
}
