//! Presentation widget state, animation bookkeeping and interaction events
//!
//! The widget renders nothing and interpolates nothing. It keeps the property
//! model, remembers which animation is playing and since when, and reports
//! interaction as events. A driver calls [`PresentationWidget::advance`]
//! periodically to complete animations whose duration has elapsed.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::events::{Position, WidgetEvent};
use crate::properties::{AnimationCurve, AnimationType, WidgetProperties};
use fext_core::prelude::*;
use fext_core::{EventBus, Listener, ListenerId};

/// An animation that has been triggered and not yet completed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveAnimation {
    pub animation_type: AnimationType,
    pub curve: AnimationCurve,
    pub duration: Duration,
    pub started_at: Instant,
}

impl ActiveAnimation {
    /// `None` when the end lies beyond what `Instant` can represent
    pub fn finishes_at(&self) -> Option<Instant> {
        self.started_at.checked_add(self.duration)
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.finishes_at().is_some_and(|end| now >= end)
    }
}

#[derive(Debug)]
struct WidgetState {
    properties: WidgetProperties,
    active: Option<ActiveAnimation>,
    hovered: bool,
}

/// A declarative display element with animation and interaction events
pub struct PresentationWidget {
    state: Mutex<WidgetState>,
    bus: EventBus<WidgetEvent>,
}

impl std::fmt::Debug for PresentationWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationWidget")
            .field("state", &*self.state.lock())
            .field("bus", &self.bus)
            .finish()
    }
}

impl Default for PresentationWidget {
    fn default() -> Self {
        Self {
            state: Mutex::new(WidgetState {
                properties: WidgetProperties::default(),
                active: None,
                hovered: false,
            }),
            bus: EventBus::new(),
        }
    }
}

impl PresentationWidget {
    pub fn new(properties: WidgetProperties) -> Result<Self> {
        properties.validate()?;
        let mut properties = properties;
        properties.clamp();
        let widget = Self::default();
        widget.state.lock().properties = properties;
        Ok(widget)
    }

    pub fn add_listener(&self, listener: impl Listener<WidgetEvent> + 'static) -> ListenerId {
        self.bus.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.bus.remove_listener(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.bus.subscribe()
    }

    pub fn properties(&self) -> WidgetProperties {
        self.state.lock().properties.clone()
    }

    pub fn active_animation(&self) -> Option<ActiveAnimation> {
        self.state.lock().active
    }

    pub fn is_hovered(&self) -> bool {
        self.state.lock().hovered
    }

    /// Start an animation with the configured duration and curve.
    ///
    /// A new trigger replaces an animation that is still playing; the
    /// replaced one never completes.
    pub fn trigger_animation(&self, animation_type: AnimationType) -> Result<bool> {
        self.trigger_animation_at(animation_type, Instant::now())
    }

    pub fn trigger_animation_at(
        &self,
        animation_type: AnimationType,
        now: Instant,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        let duration = state.properties.animation_period()?;

        if let Some(previous) = state.active.take() {
            debug!(
                "Animation {} replaced by {}",
                previous.animation_type, animation_type
            );
        }

        state.properties.animation_type = Some(animation_type);
        state.active = Some(ActiveAnimation {
            animation_type,
            curve: state.properties.animation_curve,
            duration,
            started_at: now,
        });
        debug!("Animation {} started ({:?})", animation_type, duration);
        Ok(true)
    }

    /// Apply a partial property update. Returns `true` iff anything changed.
    pub fn update_content(&self, patch: &Map<String, Value>) -> Result<bool> {
        let mut state = self.state.lock();
        let patched = state.properties.patched(patch)?;
        if patched == state.properties {
            return Ok(false);
        }
        state.properties = patched;
        debug!("Widget content updated ({} keys)", patch.len());
        Ok(true)
    }

    /// Complete the active animation if its duration has elapsed at `now`.
    /// Returns `true` if an `animation_complete` event was emitted.
    pub fn advance(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        match state.active {
            Some(active) if active.is_finished(now) => {
                state.active = None;
                trace!("Animation {} complete", active.animation_type);
                self.bus
                    .emit(WidgetEvent::animation_complete(active.animation_type));
                true
            }
            _ => false,
        }
    }

    /// Report a click. Emitted only while the widget is clickable.
    pub fn click(&self, position: Option<Position>) -> bool {
        let state = self.state.lock();
        if !state.properties.clickable {
            trace!("Click ignored: widget not clickable");
            return false;
        }
        self.bus.emit(WidgetEvent::click(position));
        true
    }

    /// Report pointer enter/exit. Emitted only when the state changes.
    pub fn hover(&self, is_hovered: bool) -> bool {
        let mut state = self.state.lock();
        if state.hovered == is_hovered {
            return false;
        }
        state.hovered = is_hovered;
        self.bus.emit(WidgetEvent::hover(is_hovered));
        true
    }
}
