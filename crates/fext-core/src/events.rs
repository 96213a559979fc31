//! Event primitives shared by the service and the widget
//!
//! Every control emits events as a name plus a flat key/value map. The
//! concrete event enums live with their controls; this module only holds the
//! pieces both of them need.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat key/value payload attached to every emitted event
pub type EventParams = Map<String, Value>;

/// An event a control can put on the wire.
pub trait ControlEvent {
    /// Event name as seen by the host (`status_change`, `click`, ...)
    fn name(&self) -> &str;

    /// Flat payload for the event
    fn params(&self) -> EventParams;
}

/// Current time as fractional seconds since the Unix epoch.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Severity attached to `error` events, derived from the numeric error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Map an error code onto a severity bucket.
    ///
    /// `>=500` critical, `>=400` error, `>=300` warning, `>=200` info, else debug.
    pub fn from_code(code: u16) -> Self {
        match code {
            500..=u16::MAX => Severity::Critical,
            400..=499 => Severity::Error,
            300..=399 => Severity::Warning,
            200..=299 => Severity::Info,
            _ => Severity::Debug,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialize a payload struct into a flat map.
///
/// Payload structs only hold scalars and maps, so anything other than a JSON
/// object here is a programming error and yields an empty map.
pub fn to_params<T: Serialize>(payload: &T) -> EventParams {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!("Event payload serialized to non-object: {}", other);
            Map::new()
        }
        Err(e) => {
            tracing::warn!("Failed to serialize event payload: {}", e);
            Map::new()
        }
    }
}
