//! Configuration file parsing for fext
//!
//! Supports `.fext/config.toml` with `[service]`, `[widget]` and `[logging]`
//! sections, overridden by command-line flags.

pub mod settings;
pub mod types;

pub use settings::{
    config_path, init_config_dir, load_settings, read_settings_file, CliOverrides,
};
pub use types::*;
