//! Events emitted by the service to the host
//!
//! Every payload embeds the counter, run-state label and uptime so an
//! observer never needs a separate `get_status` round-trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::{RunState, ServiceState};
use fext_core::{now_timestamp, to_params, ControlEvent, Error, EventParams, Severity};

/// Value of `event_source` in custom event payloads
pub const EVENT_SOURCE: &str = "fext_service";

/// Names of the built-in service events, unavailable to custom events
pub const RESERVED_EVENT_NAMES: &[&str] = &["status_change", "counter_update", "error"];

/// `status` field of `status_change` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Initialized,
    Started,
    Stopped,
    Paused,
    Completed,
    ConfigurationUpdated,
    Disposed,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Initialized => "initialized",
            ServiceStatus::Started => "started",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Paused => "paused",
            ServiceStatus::Completed => "completed",
            ServiceStatus::ConfigurationUpdated => "configuration_updated",
            ServiceStatus::Disposed => "disposed",
        }
    }
}

/// Payload of `status_change`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ServiceStatus,
    pub timestamp: f64,
    pub counter: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub interval: f64,
    pub max_count: u64,
    pub progress: f64,
    pub uptime: f64,
}

/// Payload of `counter_update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterUpdate {
    pub count: u64,
    pub message: String,
    pub timestamp: f64,
    pub progress: f64,
    pub max_count: u64,
    pub remaining: u64,
    pub percentage: f64,
    pub uptime: f64,
}

/// Payload of `error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error: String,
    pub code: u16,
    pub timestamp: f64,
    pub counter: u64,
    pub service_status: RunState,
    pub uptime: f64,
    pub severity: Severity,
}

/// A caller-named event with caller data merged with status metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    pub name: String,
    pub payload: Map<String, Value>,
}

/// Everything the service can emit
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    StatusChange(StatusChange),
    CounterUpdate(CounterUpdate),
    Error(ErrorEvent),
    Custom(CustomEvent),
}

impl ServiceEvent {
    pub(crate) fn status_change(state: &ServiceState, status: ServiceStatus) -> Self {
        ServiceEvent::StatusChange(StatusChange {
            status,
            timestamp: now_timestamp(),
            counter: state.counter,
            is_running: state.is_running,
            is_paused: state.is_paused,
            interval: state.interval,
            max_count: state.max_count,
            progress: state.progress(),
            uptime: state.uptime(),
        })
    }

    pub(crate) fn counter_update(state: &ServiceState, message: impl Into<String>) -> Self {
        let progress = state.progress();
        ServiceEvent::CounterUpdate(CounterUpdate {
            count: state.counter,
            message: message.into(),
            timestamp: now_timestamp(),
            progress,
            max_count: state.max_count,
            remaining: state.remaining(),
            percentage: (progress * 100.0 * 100.0).round() / 100.0,
            uptime: state.uptime(),
        })
    }

    pub(crate) fn error(state: &ServiceState, err: &Error) -> Self {
        let code = err.code();
        ServiceEvent::Error(ErrorEvent {
            error: err.to_string(),
            code,
            timestamp: now_timestamp(),
            counter: state.counter,
            service_status: state.run_state(),
            uptime: state.uptime(),
            severity: Severity::from_code(code),
        })
    }

    /// Build a custom event. Metadata keys override caller keys.
    pub(crate) fn custom(state: &ServiceState, name: &str, data: Map<String, Value>) -> Self {
        let mut payload = data;
        payload.insert("timestamp".into(), Value::from(now_timestamp()));
        payload.insert(
            "service_status".into(),
            Value::from(state.run_state().as_str()),
        );
        payload.insert("counter".into(), Value::from(state.counter));
        payload.insert("service_uptime".into(), Value::from(state.uptime()));
        payload.insert("event_source".into(), Value::from(EVENT_SOURCE));
        ServiceEvent::Custom(CustomEvent {
            name: name.to_string(),
            payload,
        })
    }

    /// The `status` of a `status_change` event
    pub fn status(&self) -> Option<ServiceStatus> {
        match self {
            ServiceEvent::StatusChange(change) => Some(change.status),
            _ => None,
        }
    }
}

impl ControlEvent for ServiceEvent {
    fn name(&self) -> &str {
        match self {
            ServiceEvent::StatusChange(_) => "status_change",
            ServiceEvent::CounterUpdate(_) => "counter_update",
            ServiceEvent::Error(_) => "error",
            ServiceEvent::Custom(custom) => &custom.name,
        }
    }

    fn params(&self) -> EventParams {
        match self {
            ServiceEvent::StatusChange(change) => to_params(change),
            ServiceEvent::CounterUpdate(update) => to_params(update),
            ServiceEvent::Error(error) => to_params(error),
            ServiceEvent::Custom(custom) => custom.payload.clone(),
        }
    }
}
