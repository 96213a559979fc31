//! fext - background service and presentation widget extension host
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use fext::config::{init_config_dir, load_settings, read_settings_file, CliOverrides};
use fext_core::logging;
use fext_core::prelude::*;

/// fext - periodic counter service and widget, driven over stdio
#[derive(Parser, Debug)]
#[command(name = "fext")]
#[command(about = "Background service and presentation widget extension host", long_about = None)]
struct Args {
    /// Config file (defaults to .fext/config.toml in the current directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds between ticks
    #[arg(long, value_name = "S")]
    interval: Option<f64>,

    /// Ticks before the run completes
    #[arg(long, value_name = "N")]
    max_count: Option<u64>,

    /// Start counting immediately
    #[arg(long)]
    auto_start: bool,

    /// Write a default .fext/config.toml and exit
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let project_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if args.init {
        init_config_dir(&project_path)?;
        eprintln!("Wrote {}", fext::config::config_path(&project_path).display());
        return Ok(());
    }

    // An explicit --config must load; the project file falls back to defaults
    let (mut settings, load_error) = match &args.config {
        Some(path) => (read_settings_file(path)?, None),
        None => load_settings(&project_path),
    };
    CliOverrides {
        interval: args.interval,
        max_count: args.max_count,
        auto_start: args.auto_start,
    }
    .apply(&mut settings);

    logging::init(&settings.logging.level)?;
    info!("Logging to {}", logging::get_current_log_file().display());
    if let Some(e) = load_error {
        warn!("{}; using default settings", e);
    }

    settings.validate()?;
    fext::run_stdio(settings).await?;
    Ok(())
}
