//! Typed service commands decoded from `(method, params)` pairs

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::ConfigurationUpdate;
use fext_core::prelude::*;

pub const START_SERVICE: &str = "start_service";
pub const STOP_SERVICE: &str = "stop_service";
pub const PAUSE_SERVICE: &str = "pause_service";
pub const GET_STATUS: &str = "get_status";
pub const GET_COUNTER: &str = "get_counter";
pub const RESET_COUNTER: &str = "reset_counter";
pub const SET_CONFIGURATION: &str = "set_configuration";
pub const TRIGGER_CUSTOM_EVENT: &str = "trigger_custom_event";

/// Every method name the service answers to
pub const METHODS: &[&str] = &[
    START_SERVICE,
    STOP_SERVICE,
    PAUSE_SERVICE,
    GET_STATUS,
    GET_COUNTER,
    RESET_COUNTER,
    SET_CONFIGURATION,
    TRIGGER_CUSTOM_EVENT,
];

/// A command addressed to the service
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCommand {
    Start { interval: Option<f64> },
    Stop,
    Pause,
    GetStatus,
    GetCounter,
    ResetCounter,
    SetConfiguration(ConfigurationUpdate),
    TriggerCustomEvent {
        event_name: String,
        data: Option<Map<String, Value>>,
    },
}

#[derive(Deserialize)]
struct StartParams {
    #[serde(default)]
    interval: Option<f64>,
}

#[derive(Deserialize)]
struct CustomEventParams {
    event_name: String,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

/// Deserialize params, treating a missing/null value as `{}`
fn decode_params<T: DeserializeOwned>(method: &str, params: &Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(Map::new())
    } else {
        params.clone()
    };
    serde_json::from_value(params)
        .map_err(|e| Error::invalid_argument(format!("invalid params for {}: {}", method, e)))
}

impl ServiceCommand {
    /// Decode a host request. Unknown methods are `NotFound`, params of the
    /// wrong shape are `InvalidArgument`.
    pub fn decode(method: &str, params: &Value) -> Result<Self> {
        let command = match method {
            START_SERVICE => {
                let params: StartParams = decode_params(method, params)?;
                ServiceCommand::Start {
                    interval: params.interval,
                }
            }
            STOP_SERVICE => ServiceCommand::Stop,
            PAUSE_SERVICE => ServiceCommand::Pause,
            GET_STATUS => ServiceCommand::GetStatus,
            GET_COUNTER => ServiceCommand::GetCounter,
            RESET_COUNTER => ServiceCommand::ResetCounter,
            SET_CONFIGURATION => ServiceCommand::SetConfiguration(decode_params(method, params)?),
            TRIGGER_CUSTOM_EVENT => {
                let params: CustomEventParams = decode_params(method, params)?;
                ServiceCommand::TriggerCustomEvent {
                    event_name: params.event_name,
                    data: params.data,
                }
            }
            other => return Err(Error::not_found(other)),
        };
        Ok(command)
    }

    /// Wire method name
    pub fn method(&self) -> &'static str {
        match self {
            ServiceCommand::Start { .. } => START_SERVICE,
            ServiceCommand::Stop => STOP_SERVICE,
            ServiceCommand::Pause => PAUSE_SERVICE,
            ServiceCommand::GetStatus => GET_STATUS,
            ServiceCommand::GetCounter => GET_COUNTER,
            ServiceCommand::ResetCounter => RESET_COUNTER,
            ServiceCommand::SetConfiguration(_) => SET_CONFIGURATION,
            ServiceCommand::TriggerCustomEvent { .. } => TRIGGER_CUSTOM_EVENT,
        }
    }

    /// Wire params
    pub fn params(&self) -> Value {
        match self {
            ServiceCommand::Start {
                interval: Some(interval),
            } => json!({ "interval": interval }),
            ServiceCommand::SetConfiguration(update) => {
                serde_json::to_value(update).unwrap_or(Value::Null)
            }
            ServiceCommand::TriggerCustomEvent { event_name, data } => match data {
                Some(data) => json!({ "event_name": event_name, "data": data }),
                None => json!({ "event_name": event_name }),
            },
            _ => Value::Null,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ServiceCommand::Start { .. } => "start service",
            ServiceCommand::Stop => "stop service",
            ServiceCommand::Pause => "pause service",
            ServiceCommand::GetStatus => "get status",
            ServiceCommand::GetCounter => "get counter",
            ServiceCommand::ResetCounter => "reset counter",
            ServiceCommand::SetConfiguration(_) => "set configuration",
            ServiceCommand::TriggerCustomEvent { .. } => "trigger custom event",
        }
    }

    /// Whether the command changes service state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, ServiceCommand::GetStatus | ServiceCommand::GetCounter)
    }
}
