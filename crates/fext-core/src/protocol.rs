//! Line protocol between the host and the extension
//!
//! One JSON object per line, optionally wrapped in `[...]`:
//!
//! ```text
//! → {"id":1,"method":"start_service","params":{"interval":0.5}}
//! ← {"id":1,"result":true}
//! ← {"event":"status_change","control":"service","params":{...}}
//! ← {"id":2,"error":{"message":"Unknown command: nope","code":404}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::events::{ControlEvent, EventParams};

/// Which control a request or event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Service,
    Widget,
}

impl Control {
    pub fn as_str(&self) -> &'static str {
        match self {
            Control::Service => "service",
            Control::Widget => "widget",
        }
    }
}

/// Strip the outer brackets from a line
///
/// Returns the inner content if brackets are present.
pub fn strip_brackets(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']') {
        Some(&trimmed[1..trimmed.len() - 1])
    } else {
        None
    }
}

/// A command sent by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<Control>,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
            control: None,
        }
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.control = Some(control);
        self
    }
}

/// Error body of a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: u16,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            message: err.to_string(),
            code: err.code(),
        }
    }
}

/// Reply to a [`Request`], matched by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Response {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, err: &Error) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody::from(err)),
        }
    }

    pub fn from_result(id: u64, result: &Result<Value>) -> Self {
        match result {
            Ok(value) => Self::success(id, value.clone()),
            Err(e) => Self::failure(id, e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into the caller-facing result. A missing `result` is `null`.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(body) => Err(Error::remote(body.code, body.message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// An unsolicited event from one of the controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub event: String,
    pub control: Control,
    #[serde(default)]
    pub params: EventParams,
}

impl EventMessage {
    pub fn from_event(control: Control, event: &impl ControlEvent) -> Self {
        Self {
            event: event.name().to_string(),
            control,
            params: event.params(),
        }
    }
}

/// Any line on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Event(EventMessage),
    Response(Response),
}

impl Message {
    /// Parse a line, with or without surrounding brackets
    pub fn parse(line: &str) -> Result<Self> {
        let json = strip_brackets(line).unwrap_or(line).trim();
        if json.is_empty() {
            return Err(Error::protocol("empty line"));
        }
        serde_json::from_str(json)
            .map_err(|e| Error::protocol(format!("unrecognized message: {}", e)))
    }

    /// Serialize to a single line without a trailing newline
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Human-readable summary for logs
    pub fn summary(&self) -> String {
        match self {
            Message::Request(request) => format!("Request #{}: {}", request.id, request.method),
            Message::Response(response) => {
                if response.is_success() {
                    format!("Response #{}: ok", response.id)
                } else {
                    format!("Response #{}: error", response.id)
                }
            }
            Message::Event(event) => format!("Event: {}.{}", event.control.as_str(), event.event),
        }
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Message::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

impl From<EventMessage> for Message {
    fn from(event: EventMessage) -> Self {
        Message::Event(event)
    }
}

/// Best-effort `id` of a line that failed to parse, so the error can still
/// be answered
pub fn recover_request_id(line: &str) -> Option<u64> {
    let json = strip_brackets(line).unwrap_or(line);
    serde_json::from_str::<Value>(json)
        .ok()?
        .get("id")?
        .as_u64()
}
