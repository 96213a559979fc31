//! # fext-widget - Presentation Widget
//!
//! Property model, animation bookkeeping and interaction events for the
//! display element paired with the background service. Rendering is left to
//! the host.
//!
//! ## Public API
//!
//! - [`PresentationWidget`] - Widget state with `trigger_animation`,
//!   `update_content`, `advance`, `click` and `hover`
//! - [`WidgetProperties`] - Property model with defaults and clamping
//! - [`WidgetEvent`] - `animation_complete`, `click` and `hover`
//! - [`WidgetCommand`] - Typed command decoded from `(method, params)`

pub mod command;
pub mod events;
pub mod properties;
pub mod widget;

pub use command::{is_widget_method, WidgetCommand};
pub use events::{Position, WidgetEvent};
pub use properties::{AnimationCurve, AnimationType, WidgetProperties};
pub use widget::{ActiveAnimation, PresentationWidget};
