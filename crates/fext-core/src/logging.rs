//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Environment variable that overrides the configured log filter
pub const LOG_ENV_VAR: &str = "FEXT_LOG";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/fext/logs/` because stdout carries the
/// host protocol. `default_level` comes from the config file and is used only
/// when `FEXT_LOG` is unset.
///
/// # Examples
/// ```bash
/// FEXT_LOG=debug fext
/// FEXT_LOG=fext_service=trace fext
/// ```
pub fn init(default_level: &str) -> Result<()> {
    let log_dir = get_log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "fext.log");

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| default_filter(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .map_err(|e| Error::logging(e.to_string()))?;

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("fext starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Build the filter used when `FEXT_LOG` is not set
fn default_filter(level: &str) -> EnvFilter {
    let directive = format!(
        "fext={level},fext_core={level},fext_service={level},fext_widget={level},warn"
    );
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("fext=info,warn"))
}

/// Get the log directory path
fn get_log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("fext").join("logs")
}

/// Get the log file path for the current day
pub fn get_current_log_file() -> PathBuf {
    get_log_directory().join("fext.log")
}
