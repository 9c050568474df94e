//! logdeck library
//!
//! Command implementations behind the `logdeck` binary.

pub mod commands;
pub mod tail;

pub use commands::{Console, ServiceUpdate};
pub use tail::{run_tail, TailOptions};
