//! Configuration types for fext
//!
//! Defines:
//! - `Settings` - Contents of `.fext/config.toml`
//! - `WidgetSettings` / `LoggingSettings` - Related sub-sections

use serde::{Deserialize, Serialize};

use fext_core::prelude::*;
use fext_service::ServiceConfig;
use fext_widget::WidgetProperties;

/// Global settings from `.fext/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub service: ServiceConfig,
    pub widget: WidgetSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Reject values the service or widget would refuse at startup
    pub fn validate(&self) -> Result<()> {
        self.service
            .validate()
            .map_err(|e| Error::config_invalid(format!("[service] {}", e)))?;
        self.widget_properties()
            .validate()
            .map_err(|e| Error::config_invalid(format!("[widget] {}", e)))?;
        Ok(())
    }

    /// Initial widget properties derived from `[widget]`
    pub fn widget_properties(&self) -> WidgetProperties {
        WidgetProperties {
            animation_duration: self.widget.animation_duration,
            clickable: self.widget.clickable,
            ..Default::default()
        }
    }
}

/// `[widget]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WidgetSettings {
    /// Seconds an animation plays before `animation_complete`
    pub animation_duration: f64,

    pub clickable: bool,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            animation_duration: 1.0,
            clickable: true,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level for fext crates when `FEXT_LOG` is unset
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
