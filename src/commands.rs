//! One-shot console commands: login, registry queries, downloads.
//!
//! The REST client is blocking, so every call runs on the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use logdeck_app::{CredentialSource, CredentialStore, Settings};
use logdeck_client::{ConsoleApi, LogFileEntry, ServiceEntry, ServiceRecord};
use logdeck_core::prelude::*;
use logdeck_core::{Credential, LogTarget};

/// Field changes for `apps update`; unset fields keep their registered value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub port: Option<String>,
    pub path: Option<String>,
}

impl ServiceUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.ip.is_none() && self.port.is_none() && self.path.is_none()
    }

    /// Overlay these changes onto `record`; an empty `path` clears it
    pub fn apply(self, record: &mut ServiceRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(ip) = self.ip {
            record.ip = ip;
        }
        if let Some(port) = self.port {
            record.port = port;
        }
        if let Some(path) = self.path {
            record.path = Some(path).filter(|p| !p.is_empty());
        }
    }
}

/// Console client bound to the loaded settings and credential store
#[derive(Debug)]
pub struct Console {
    api: Arc<ConsoleApi>,
    store: CredentialStore,
    settings: Settings,
}

impl Console {
    pub fn new(settings: Settings, store: CredentialStore) -> Result<Self> {
        let api = ConsoleApi::new(settings.server.base_url()?, settings.server.timeout());
        Ok(Self {
            api: Arc::new(api),
            store,
            settings,
        })
    }

    pub fn api(&self) -> Arc<ConsoleApi> {
        Arc::clone(&self.api)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    fn credential(&self) -> Result<Credential> {
        self.store.credential().ok_or(Error::Unauthenticated)
    }

    /// Run a REST call off the async runtime. A rejected credential is forgotten.
    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ConsoleApi) -> Result<T> + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        let result = tokio::task::spawn_blocking(move || f(&api))
            .await
            .map_err(|e| Error::http(format!("request task failed: {e}")))?;

        if matches!(result, Err(Error::Unauthenticated)) {
            warn!("Console rejected the saved credential; clearing it");
            if let Err(e) = self.store.clear() {
                warn!("Failed to clear credential: {}", e);
            }
        }
        result
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let username = username.to_string();
        let password = password.to_string();
        let credential = self
            .call(move |api| api.login(&username, &password))
            .await?;
        self.store.save(&credential)?;
        info!("Logged in to {}", self.api.base_url());
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }

    pub async fn apps(&self) -> Result<Vec<ServiceEntry>> {
        let credential = self.credential()?;
        self.call(move |api| api.app_list(&credential)).await
    }

    /// Registered service with this exact name
    pub async fn find_app(&self, name: &str) -> Result<ServiceEntry> {
        self.apps()
            .await?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| Error::config(format!("no registered service named '{name}'")))
    }

    pub async fn add_app(&self, record: ServiceRecord) -> Result<()> {
        let credential = self.credential()?;
        let sent = record.clone();
        self.call(move |api| api.add_app(&sent, &credential))
            .await?;
        info!("Registered service {}", record_label(&record));
        Ok(())
    }

    /// Apply `changes` to the registered service with `id` and return the saved record
    pub async fn update_app(&self, id: &str, changes: ServiceUpdate) -> Result<ServiceRecord> {
        let entry = self
            .apps()
            .await?
            .into_iter()
            .find(|entry| entry.id.as_deref() == Some(id))
            .ok_or_else(|| Error::config(format!("no registered service with id '{id}'")))?;

        let mut record = entry.record();
        changes.apply(&mut record);

        let credential = self.credential()?;
        let saved = record.clone();
        self.call(move |api| api.update_app(&record, &credential))
            .await?;
        info!("Updated service {}", record_label(&saved));
        Ok(saved)
    }

    pub async fn delete_apps(&self, ids: Vec<String>) -> Result<()> {
        let credential = self.credential()?;
        let count = ids.len();
        self.call(move |api| api.delete_apps(&ids, &credential))
            .await?;
        info!("Deleted {} service(s)", count);
        Ok(())
    }

    /// Whether the service behind `target` is running
    pub async fn status(&self, target: &LogTarget) -> Result<bool> {
        let credential = self.credential()?;
        let target = target.clone();
        self.call(move |api| api.app_status(&target, &credential))
            .await
    }

    pub async fn log_files(&self, target: &LogTarget) -> Result<Vec<LogFileEntry>> {
        let credential = self.credential()?;
        let target = target.clone();
        self.call(move |api| api.log_list(&target, &credential))
            .await
    }

    /// Fetch the download URL for `target`'s log file and save it under `dir`
    pub async fn download(&self, target: &LogTarget, dir: &Path) -> Result<PathBuf> {
        let credential = self.credential()?;
        let target = target.clone();
        let dir = dir.to_path_buf();
        self.call(move |api| {
            let url = api.log_url(&target, &credential)?;
            api.download(&url, &dir)
        })
        .await
    }
}

fn record_label(record: &ServiceRecord) -> String {
    format!("{} ({}:{})", record.name, record.ip, record.port)
}
