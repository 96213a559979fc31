//! Settings loader for .fext/config.toml

use std::path::{Path, PathBuf};

use super::types::Settings;
use fext_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const FEXT_DIR: &str = ".fext";

/// Path of the project config file
pub fn config_path(project_path: &Path) -> PathBuf {
    project_path.join(FEXT_DIR).join(CONFIG_FILENAME)
}

/// Load settings from `.fext/config.toml` under `project_path`.
///
/// A missing file yields defaults. An unreadable or malformed file also
/// yields defaults, and the error is handed back so the caller can report
/// it once logging is up.
pub fn load_settings(project_path: &Path) -> (Settings, Option<Error>) {
    match read_settings_file(&config_path(project_path)) {
        Ok(settings) => (settings, None),
        Err(Error::ConfigNotFound { path }) => {
            debug!("No config file at {:?}, using defaults", path);
            (Settings::default(), None)
        }
        Err(e) => (Settings::default(), Some(e)),
    }
}

/// Read settings from an explicit file without falling back to defaults
pub fn read_settings_file(config_path: &Path) -> Result<Settings> {
    if !config_path.exists() {
        return Err(Error::ConfigNotFound {
            path: config_path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(config_path).map_err(|e| {
        Error::config(format!("Failed to read {}: {}", config_path.display(), e))
    })?;
    let settings = toml::from_str(&content).map_err(|e| {
        Error::config_invalid(format!("Failed to parse {}: {}", config_path.display(), e))
    })?;
    debug!("Loaded settings from {:?}", config_path);
    Ok(settings)
}

/// Values given on the command line, applied over the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub interval: Option<f64>,
    pub max_count: Option<u64>,
    pub auto_start: bool,
}

impl CliOverrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(interval) = self.interval {
            settings.service.interval = interval;
        }
        if let Some(max_count) = self.max_count {
            settings.service.max_count = max_count;
        }
        if self.auto_start {
            settings.service.auto_start = true;
        }
    }
}

/// Create `.fext/config.toml` with commented defaults if it is missing
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let fext_dir = project_path.join(FEXT_DIR);

    if !fext_dir.exists() {
        std::fs::create_dir_all(&fext_dir)
            .map_err(|e| Error::config(format!("Failed to create .fext dir: {}", e)))?;
        info!("Created .fext directory");
    }

    let config_path = fext_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, default_config())
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config.toml");
    }

    Ok(())
}

fn default_config() -> &'static str {
    r#"# fext Configuration

[service]
auto_start = false      # Start counting as soon as the host starts
interval = 1.0          # Seconds between ticks
max_count = 10          # Ticks before the run completes

[widget]
animation_duration = 1.0  # Seconds before animation_complete
clickable = true

[logging]
level = "info"          # Overridden by FEXT_LOG
"#
}
