//! Mutable service record and read-only status snapshots

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::config::ServiceConfig;
use fext_core::now_timestamp;

/// Coarse run state derived from the `is_running` / `is_paused` flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

impl RunState {
    /// Label embedded in events (`running`, `paused`, `stopped`)
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Stopped => "stopped",
            RunState::Running => "running",
            RunState::Paused => "paused",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single mutable record owned by a service instance.
///
/// Only `ServiceLifecycle` mutates it, always under its state lock.
#[derive(Debug)]
pub(crate) struct ServiceState {
    pub is_running: bool,
    pub is_paused: bool,
    pub counter: u64,
    pub interval: f64,
    pub max_count: u64,
    pub start_time: Option<DateTime<Utc>>,
    /// Live periodic task, present iff running and not paused
    pub timer: Option<JoinHandle<()>>,
    /// Bumped on every cancel; a tick from an older generation is stale
    pub timer_generation: u64,
    pub disposed: bool,
}

impl ServiceState {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            is_running: false,
            is_paused: false,
            counter: 0,
            interval: config.interval,
            max_count: config.max_count,
            start_time: None,
            timer: None,
            timer_generation: 0,
            disposed: false,
        }
    }

    pub fn run_state(&self) -> RunState {
        match (self.is_running, self.is_paused) {
            (true, true) => RunState::Paused,
            (true, false) => RunState::Running,
            _ => RunState::Stopped,
        }
    }

    /// Seconds since the run started, 0 if never started
    pub fn uptime(&self) -> f64 {
        self.start_time
            .map(|start| {
                (Utc::now() - start)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .as_secs_f64()
            })
            .unwrap_or(0.0)
    }

    pub fn progress(&self) -> f64 {
        progress(self.counter, self.max_count)
    }

    pub fn remaining(&self) -> u64 {
        self.max_count.saturating_sub(self.counter)
    }

    /// Abort the live timer, if any, and invalidate ticks already in flight.
    pub fn cancel_timer(&mut self) {
        self.timer_generation = self.timer_generation.wrapping_add(1);
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            is_running: self.is_running,
            is_paused: self.is_paused,
            status: self.run_state(),
            counter: self.counter,
            interval: self.interval,
            max_count: self.max_count,
            start_time: self
                .start_time
                .map(|t| t.timestamp_micros() as f64 / 1_000_000.0),
            uptime_seconds: self.uptime(),
            progress: self.progress(),
            timestamp: now_timestamp(),
        }
    }
}

/// `counter / max_count` clamped to `[0, 1]`, 0 when `max_count` is 0
pub fn progress(counter: u64, max_count: u64) -> f64 {
    if max_count == 0 {
        return 0.0;
    }
    (counter as f64 / max_count as f64).clamp(0.0, 1.0)
}

/// Point-in-time view returned by `get_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub is_paused: bool,
    pub status: RunState,
    pub counter: u64,
    pub interval: f64,
    pub max_count: u64,
    /// Epoch seconds of the current run's start
    pub start_time: Option<f64>,
    pub uptime_seconds: f64,
    pub progress: f64,
    pub timestamp: f64,
}
