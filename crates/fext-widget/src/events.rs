//! Events emitted by the presentation widget

use serde::{Deserialize, Serialize};

use crate::properties::AnimationType;
use fext_core::{now_timestamp, to_params, ControlEvent, EventParams};

/// Pointer position of a click, in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationComplete {
    pub animation_type: AnimationType,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Click {
    pub timestamp: f64,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hover {
    pub is_hovered: bool,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    AnimationComplete(AnimationComplete),
    Click(Click),
    Hover(Hover),
}

impl WidgetEvent {
    pub(crate) fn animation_complete(animation_type: AnimationType) -> Self {
        WidgetEvent::AnimationComplete(AnimationComplete {
            animation_type,
            timestamp: now_timestamp(),
        })
    }

    pub(crate) fn click(position: Option<Position>) -> Self {
        WidgetEvent::Click(Click {
            timestamp: now_timestamp(),
            position,
        })
    }

    pub(crate) fn hover(is_hovered: bool) -> Self {
        WidgetEvent::Hover(Hover {
            is_hovered,
            timestamp: now_timestamp(),
        })
    }
}

impl ControlEvent for WidgetEvent {
    fn name(&self) -> &str {
        match self {
            WidgetEvent::AnimationComplete(_) => "animation_complete",
            WidgetEvent::Click(_) => "click",
            WidgetEvent::Hover(_) => "hover",
        }
    }

    fn params(&self) -> EventParams {
        match self {
            WidgetEvent::AnimationComplete(e) => to_params(e),
            WidgetEvent::Click(e) => to_params(e),
            WidgetEvent::Hover(e) => to_params(e),
        }
    }
}
