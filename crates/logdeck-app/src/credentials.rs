//! Credential storage
//!
//! The access credential from `logdeck login` is kept in
//! `~/.config/logdeck/credentials.toml` and read back by every command that
//! talks to the console.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use logdeck_core::prelude::*;
use logdeck_core::Credential;

use crate::config::config_dir;

const CREDENTIALS_FILENAME: &str = "credentials.toml";

/// Where live log buffers read the current credential from
///
/// Queried on every `start`, so a login that happens while a buffer exists
/// is picked up by the next start.
pub trait CredentialSource: Send + Sync {
    /// The usable credential, or `None` when logged out
    fn credential(&self) -> Option<Credential>;
}

/// In-memory credential that can be swapped at runtime
#[derive(Debug, Default)]
pub struct StaticCredentials {
    inner: RwLock<Option<Credential>>,
}

impl StaticCredentials {
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            inner: RwLock::new(credential),
        }
    }

    pub fn logged_in(credential: Credential) -> Self {
        Self::new(Some(credential))
    }

    pub fn logged_out() -> Self {
        Self::new(None)
    }

    pub fn set(&self, credential: Option<Credential>) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = credential;
    }
}

impl CredentialSource for StaticCredentials {
    fn credential(&self) -> Option<Credential> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(Credential::is_present)
    }
}

/// Credential persisted as TOML on disk
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location under the user config directory
    pub fn open_default() -> Self {
        Self::new(config_dir().join(CREDENTIALS_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved credential, `None` if nobody has logged in
    pub fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let credential: Credential = toml::from_str(&content)?;
        Ok(Some(credential))
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string(credential)
            .map_err(|e| Error::config(format!("failed to serialize credential: {e}")))?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        restrict_permissions(&self.path)
            .context("Failed to restrict credential file permissions")?;
        debug!("Saved credential to {:?}", self.path);
        Ok(())
    }

    /// Forget the saved credential; a missing file is not an error
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed credential file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove credential file"),
        }
    }
}

impl CredentialSource for CredentialStore {
    fn credential(&self) -> Option<Credential> {
        match self.load() {
            Ok(credential) => credential.filter(Credential::is_present),
            Err(e) => {
                warn!("Ignoring unreadable credential file {:?}: {}", self.path, e);
                None
            }
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
