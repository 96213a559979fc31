//! fext - background service and presentation widget extension host
//!
//! The binary speaks newline-delimited JSON on stdio. Configuration comes
//! from `.fext/config.toml` and command-line flags.

pub mod config;
pub mod host;

pub use config::{load_settings, Settings};
pub use host::{run, run_stdio, Host};
