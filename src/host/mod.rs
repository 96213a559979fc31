//! Stdio host - routes protocol lines to the service and the widget
//!
//! Every output line (responses and events alike) goes through one unbounded
//! channel drained by a single writer task, so the order on stdout is the
//! order in which lines were produced. Events raised while a command runs are
//! therefore written before that command's response.
//!
//! # Example Session
//!
//! ```json
//! {"id":1,"method":"start_service","params":{"interval":0.5}}
//! {"event":"status_change","control":"service","params":{"status":"started",...}}
//! {"id":1,"result":true}
//! {"event":"counter_update","control":"service","params":{"count":1,...}}
//! ```

pub mod runner;

use std::time::Instant;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::Settings;
use fext_core::prelude::*;
use fext_core::protocol::recover_request_id;
use fext_core::{Control, EventMessage, Message, Request, Response};
use fext_service::{ServiceEvent, ServiceLifecycle};
use fext_widget::{is_widget_method, PresentationWidget, WidgetEvent};

pub use runner::{run, run_stdio, HOUSEKEEPING_INTERVAL};

/// Method that ends the session
pub const SHUTDOWN_METHOD: &str = "shutdown";

/// Whether the read loop should keep going after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

/// One service and one widget wired to an output line channel
pub struct Host {
    service: ServiceLifecycle,
    widget: PresentationWidget,
    out_tx: mpsc::UnboundedSender<String>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("service", &self.service)
            .field("widget", &self.widget)
            .finish()
    }
}

/// Current time on the runtime clock, so paused test time drives animations
pub fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Encode a message and queue it for the writer
fn send_line(out_tx: &mpsc::UnboundedSender<String>, message: Message) {
    match message.encode() {
        Ok(line) => {
            if out_tx.send(line).is_err() {
                debug!("Output closed, dropping {}", message.summary());
            }
        }
        Err(e) => error!("Failed to encode {}: {}", message.summary(), e),
    }
}

impl Host {
    /// Build both controls and forward their events to `out_tx`.
    ///
    /// Must run inside a Tokio runtime when `auto_start` is set.
    pub fn new(settings: &Settings, out_tx: mpsc::UnboundedSender<String>) -> Result<Self> {
        settings.validate()?;

        let service = ServiceLifecycle::new(settings.service.clone())?;
        let widget = PresentationWidget::new(settings.widget_properties())?;

        let tx = out_tx.clone();
        service.add_listener(move |event: &ServiceEvent| {
            send_line(
                &tx,
                EventMessage::from_event(Control::Service, event).into(),
            );
        });
        let tx = out_tx.clone();
        widget.add_listener(move |event: &WidgetEvent| {
            send_line(&tx, EventMessage::from_event(Control::Widget, event).into());
        });

        service.initialize()?;

        Ok(Self {
            service,
            widget,
            out_tx,
        })
    }

    pub fn service(&self) -> &ServiceLifecycle {
        &self.service
    }

    pub fn widget(&self) -> &PresentationWidget {
        &self.widget
    }

    /// Handle one input line, writing a response if it was a request
    pub fn handle_line(&self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }

        match Message::parse(line) {
            Ok(Message::Request(request)) => {
                debug!("Received request #{}: {}", request.id, request.method);
                let (result, flow) = self.dispatch(&request);
                send_line(&self.out_tx, Response::from_result(request.id, &result).into());
                flow
            }
            Ok(other) => {
                warn!("Ignoring unexpected {}", other.summary());
                Flow::Continue
            }
            Err(e) => {
                warn!("Bad input line: {}", e);
                if let Some(id) = recover_request_id(line) {
                    let err = Error::invalid_argument(format!("malformed request: {}", e));
                    send_line(&self.out_tx, Response::failure(id, &err).into());
                }
                Flow::Continue
            }
        }
    }

    /// Route a request to its control.
    ///
    /// An explicit `control` wins; otherwise widget method names go to the
    /// widget and everything else to the service.
    pub fn dispatch(&self, request: &Request) -> (Result<Value>, Flow) {
        if request.method == SHUTDOWN_METHOD {
            info!("Shutdown requested");
            return (Ok(Value::Bool(true)), Flow::Shutdown);
        }

        let control = request.control.unwrap_or_else(|| {
            if is_widget_method(&request.method) {
                Control::Widget
            } else {
                Control::Service
            }
        });

        let result = match control {
            Control::Service => self.service.handle_request(&request.method, &request.params),
            Control::Widget => {
                self.widget
                    .handle_request_at(&request.method, &request.params, clock_now())
            }
        };
        match &result {
            Err(e) if e.is_recoverable() => {
                debug!("{} '{}' rejected: {}", control.as_str(), request.method, e)
            }
            Err(e) => warn!("{} '{}' failed: {}", control.as_str(), request.method, e),
            Ok(_) => {}
        }
        (result, Flow::Continue)
    }

    /// Housekeeping tick: complete finished widget animations
    pub fn advance(&self, now: Instant) {
        self.widget.advance(now);
    }

    /// Dispose the service. Safe to call more than once.
    pub fn shutdown(&self) {
        self.service.dispose();
    }
}
