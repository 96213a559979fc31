//! Widget property model

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use fext_core::prelude::*;

/// Highest Material elevation the widget accepts
pub const MAX_ELEVATION: f64 = 24.0;

/// Longest accepted animation (one day)
pub const MAX_ANIMATION_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Animation kinds the widget can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationType {
    Fade,
    Scale,
    Slide,
    Rotate,
}

impl AnimationType {
    pub const ALL: [AnimationType; 4] = [
        AnimationType::Fade,
        AnimationType::Scale,
        AnimationType::Slide,
        AnimationType::Rotate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationType::Fade => "fade",
            AnimationType::Scale => "scale",
            AnimationType::Slide => "slide",
            AnimationType::Rotate => "rotate",
        }
    }
}

impl std::fmt::Display for AnimationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AnimationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "invalid animation_type '{}', must be one of: fade, scale, slide, rotate",
                    s
                ))
            })
    }
}

/// Easing curve carried alongside an animation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationCurve {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
    BounceIn,
    BounceOut,
    Decelerate,
    FastOutSlowIn,
}

/// Visual and behavioral properties of the widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WidgetProperties {
    // Content
    pub src: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,

    // Visual
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub border_color: Option<String>,
    pub border_width: f64,
    pub border_radius: f64,

    // Size and spacing
    pub font_size: f64,
    pub padding: f64,
    pub margin: f64,

    // Animation
    pub animation_type: Option<AnimationType>,
    /// Seconds
    pub animation_duration: f64,
    pub animation_curve: AnimationCurve,

    // Interaction
    pub clickable: bool,
    pub elevation: f64,
    pub opacity: f64,
}

impl Default for WidgetProperties {
    fn default() -> Self {
        Self {
            src: None,
            title: None,
            subtitle: None,
            background_color: None,
            text_color: None,
            border_color: None,
            border_width: 0.0,
            border_radius: 8.0,
            font_size: 14.0,
            padding: 16.0,
            margin: 0.0,
            animation_type: None,
            animation_duration: 1.0,
            animation_curve: AnimationCurve::EaseInOut,
            clickable: true,
            elevation: 2.0,
            opacity: 1.0,
        }
    }
}

impl WidgetProperties {
    /// Clamp `elevation` to `[0, 24]` and `opacity` to `[0, 1]`
    pub fn clamp(&mut self) {
        self.elevation = self.elevation.clamp(0.0, MAX_ELEVATION);
        self.opacity = self.opacity.clamp(0.0, 1.0);
    }

    pub fn validate(&self) -> Result<()> {
        let lengths = [
            ("border_width", self.border_width),
            ("border_radius", self.border_radius),
            ("font_size", self.font_size),
            ("padding", self.padding),
            ("margin", self.margin),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::invalid_argument(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !self.elevation.is_finite() || !self.opacity.is_finite() {
            return Err(Error::invalid_argument("elevation and opacity must be finite"));
        }
        self.animation_period().map(|_| ())
    }

    /// `animation_duration` as a `Duration`, at most [`MAX_ANIMATION_SECS`]
    pub fn animation_period(&self) -> Result<Duration> {
        let secs = self.animation_duration;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(Error::invalid_argument(format!(
                "animation_duration must be a positive number of seconds, got {}",
                secs
            )));
        }
        if secs > MAX_ANIMATION_SECS {
            return Err(Error::invalid_argument(format!(
                "animation_duration must be at most {} seconds, got {}",
                MAX_ANIMATION_SECS, secs
            )));
        }
        Duration::try_from_secs_f64(secs).map_err(|_| {
            Error::invalid_argument(format!("animation_duration {} is out of range", secs))
        })
    }

    /// Apply a partial update to a copy of these properties.
    ///
    /// `null` values leave a property unchanged. Unknown keys and values of
    /// the wrong type are rejected before anything is applied.
    pub fn patched(&self, patch: &Map<String, Value>) -> Result<Self> {
        let mut merged = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => return Err(Error::protocol("widget properties did not serialize to an object")),
        };

        for (key, value) in patch {
            if !merged.contains_key(key) {
                return Err(Error::invalid_argument(format!("unknown property '{}'", key)));
            }
            if value.is_null() {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }

        let mut patched: WidgetProperties = serde_json::from_value(Value::Object(merged))
            .map_err(|e| Error::invalid_argument(format!("invalid property value: {}", e)))?;
        patched.validate()?;
        patched.clamp();
        Ok(patched)
    }
}
