//! Service configuration and runtime reconfiguration requests

use std::time::Duration;

use serde::{Deserialize, Serialize};

use fext_core::prelude::*;

/// Default timer period in seconds
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Default number of ticks before the service completes
pub const DEFAULT_MAX_COUNT: u64 = 10;

/// Longest accepted timer period (one year)
pub const MAX_INTERVAL_SECS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Initial configuration of a service instance
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Start ticking as soon as the service is created
    pub auto_start: bool,

    /// Timer period in seconds
    pub interval: f64,

    /// Ticks before automatic completion
    pub max_count: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auto_start: false,
            interval: DEFAULT_INTERVAL_SECS,
            max_count: DEFAULT_MAX_COUNT,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        validate_interval(self.interval)?;
        if self.max_count == 0 {
            return Err(Error::invalid_argument("max_count must be positive, got 0"));
        }
        Ok(())
    }
}

/// Check a timer period and convert it to a `Duration`.
///
/// The period must be finite, positive, at most [`MAX_INTERVAL_SECS`] and
/// representable as a non-zero `Duration`. The bound keeps every timer
/// deadline inside the range of `Instant`.
pub fn validate_interval(interval: f64) -> Result<Duration> {
    if !interval.is_finite() || interval <= 0.0 {
        return Err(Error::invalid_argument(format!(
            "interval must be a positive number of seconds, got {}",
            interval
        )));
    }
    if interval > MAX_INTERVAL_SECS {
        return Err(Error::invalid_argument(format!(
            "interval must be at most {} seconds, got {}",
            MAX_INTERVAL_SECS, interval
        )));
    }

    match Duration::try_from_secs_f64(interval) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(Error::invalid_argument(format!(
            "interval {} is outside the supported range",
            interval
        ))),
    }
}

/// Check a tick limit coming from the host
pub fn validate_max_count(max_count: i64) -> Result<u64> {
    if max_count <= 0 {
        return Err(Error::invalid_argument(format!(
            "max_count must be positive, got {}",
            max_count
        )));
    }
    Ok(max_count as u64)
}

/// Partial reconfiguration sent with `set_configuration`
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct ConfigurationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<i64>,
}

impl ConfigurationUpdate {
    pub fn interval(interval: f64) -> Self {
        Self {
            interval: Some(interval),
            max_count: None,
        }
    }

    pub fn max_count(max_count: i64) -> Self {
        Self {
            interval: None,
            max_count: Some(max_count),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.interval.is_none() && self.max_count.is_none()
    }

    /// Validate every present field before anything is applied.
    pub(crate) fn validate(&self) -> Result<ValidatedUpdate> {
        let interval = self
            .interval
            .map(|secs| validate_interval(secs).map(|_| secs))
            .transpose()?;
        let max_count = self.max_count.map(validate_max_count).transpose()?;
        Ok(ValidatedUpdate {
            interval,
            max_count,
        })
    }
}

/// A [`ConfigurationUpdate`] whose values passed validation
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValidatedUpdate {
    pub interval: Option<f64>,
    pub max_count: Option<u64>,
}
