//! Widget commands and their execution

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::events::Position;
use crate::properties::AnimationType;
use crate::widget::PresentationWidget;
use fext_core::prelude::*;

pub const TRIGGER_ANIMATION: &str = "trigger_animation";
pub const UPDATE_CONTENT: &str = "update_content";
pub const CLICK: &str = "click";
pub const HOVER: &str = "hover";
pub const GET_PROPERTIES: &str = "get_properties";

/// Every method name the widget answers to
pub const METHODS: &[&str] = &[TRIGGER_ANIMATION, UPDATE_CONTENT, CLICK, HOVER, GET_PROPERTIES];

/// Whether `method` is addressed to the widget when no control is named
pub fn is_widget_method(method: &str) -> bool {
    METHODS.contains(&method)
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetCommand {
    TriggerAnimation { animation_type: AnimationType },
    UpdateContent(Map<String, Value>),
    Click { position: Option<Position> },
    Hover { is_hovered: bool },
    GetProperties,
}

#[derive(Deserialize)]
struct AnimationParams {
    #[serde(default = "default_animation")]
    animation_type: String,
}

fn default_animation() -> String {
    AnimationType::Fade.as_str().to_string()
}

#[derive(Deserialize)]
struct ClickParams {
    #[serde(default)]
    position: Option<Position>,
}

#[derive(Deserialize)]
struct HoverParams {
    is_hovered: bool,
}

fn decode_params<T: DeserializeOwned>(method: &str, params: &Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(Map::new())
    } else {
        params.clone()
    };
    serde_json::from_value(params)
        .map_err(|e| Error::invalid_argument(format!("invalid params for {}: {}", method, e)))
}

impl WidgetCommand {
    pub fn decode(method: &str, params: &Value) -> Result<Self> {
        let command = match method {
            TRIGGER_ANIMATION => {
                let params: AnimationParams = decode_params(method, params)?;
                WidgetCommand::TriggerAnimation {
                    animation_type: params.animation_type.parse()?,
                }
            }
            UPDATE_CONTENT => WidgetCommand::UpdateContent(decode_params(method, params)?),
            CLICK => {
                let params: ClickParams = decode_params(method, params)?;
                WidgetCommand::Click {
                    position: params.position,
                }
            }
            HOVER => {
                let params: HoverParams = decode_params(method, params)?;
                WidgetCommand::Hover {
                    is_hovered: params.is_hovered,
                }
            }
            GET_PROPERTIES => WidgetCommand::GetProperties,
            other => return Err(Error::not_found(other)),
        };
        Ok(command)
    }

    pub fn method(&self) -> &'static str {
        match self {
            WidgetCommand::TriggerAnimation { .. } => TRIGGER_ANIMATION,
            WidgetCommand::UpdateContent(_) => UPDATE_CONTENT,
            WidgetCommand::Click { .. } => CLICK,
            WidgetCommand::Hover { .. } => HOVER,
            WidgetCommand::GetProperties => GET_PROPERTIES,
        }
    }
}

impl PresentationWidget {
    pub fn execute(&self, command: WidgetCommand) -> Result<Value> {
        self.execute_at(command, Instant::now())
    }

    /// Run a command with `now` as the animation start time
    pub fn execute_at(&self, command: WidgetCommand, now: Instant) -> Result<Value> {
        let result = match command {
            WidgetCommand::TriggerAnimation { animation_type } => {
                Value::Bool(self.trigger_animation_at(animation_type, now)?)
            }
            WidgetCommand::UpdateContent(patch) => Value::Bool(self.update_content(&patch)?),
            WidgetCommand::Click { position } => Value::Bool(self.click(position)),
            WidgetCommand::Hover { is_hovered } => Value::Bool(self.hover(is_hovered)),
            WidgetCommand::GetProperties => serde_json::to_value(self.properties())?,
        };
        Ok(result)
    }

    /// Decode and run a host request
    pub fn handle_request(&self, method: &str, params: &Value) -> Result<Value> {
        self.handle_request_at(method, params, Instant::now())
    }

    /// [`handle_request`](Self::handle_request) against the caller's clock
    pub fn handle_request_at(&self, method: &str, params: &Value, now: Instant) -> Result<Value> {
        let command = WidgetCommand::decode(method, params)?;
        debug!("Widget command: {}", command.method());
        self.execute_at(command, now)
    }
}
