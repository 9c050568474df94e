//! # logdeck-app - Live Log Buffer and Local State
//!
//! The application layer of logdeck. Owns everything that outlives a single
//! console request: the paged live log buffer, the on-disk settings, and the
//! saved login credential.
//!
//! ## Public API
//!
//! ### Live Log
//! - [`LiveLogBuffer`] - Session lifecycle, coalescing, and newest-first paging
//! - [`LiveLogDeps`] - Injected collaborators (control, transport, credentials, output)
//! - [`Notifier`], [`LogView`] - Output seams
//!
//! ### Configuration
//! - [`Settings`] - Parsed `config.toml`
//! - [`load_settings()`] - Load with defaults on failure
//!
//! ### Credentials
//! - [`CredentialSource`] - Where buffers read the access credential
//! - [`CredentialStore`] - TOML-backed persistent credential

pub mod config;
pub mod credentials;
pub mod live_log;

pub use config::{load_settings, LiveLogSettings, ServerSettings, Settings};
pub use credentials::{CredentialSource, CredentialStore, StaticCredentials};
pub use live_log::{LiveLogBuffer, LiveLogDeps, LiveLogMessage, LogView, Notifier, PageInfo};
