//! # logdeck-core - Core Domain Types
//!
//! Foundation crate for logdeck. Provides domain types, error handling, and
//! logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing, rand).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`LogLine`] - A single decoded line with a process-unique id
//! - [`LogTarget`] - Host/port/log-name coordinates of a remote log
//! - [`SessionKey`] - Correlation token for one live log session
//! - [`Credential`] - Access credential from the console login endpoint
//! - [`ConnectionState`] - Idle, Connecting, Open, Closed
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use logdeck_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod prelude;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::{
    next_log_line_id, ConnectionState, Credential, LogLine, LogLineId, LogTarget, SessionKey,
    SESSION_KEY_LEN,
};
