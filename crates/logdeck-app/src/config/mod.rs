//! Configuration file parsing for logdeck
//!
//! Supports:
//! - `~/.config/logdeck/config.toml` - Server endpoints and live log settings

pub mod settings;
pub mod types;

pub use settings::{config_dir, default_settings_path, load_settings, load_settings_strict};
pub use types::*;
