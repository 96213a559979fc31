//! # fext-service - Periodic Counter Service
//!
//! A long-lived background service that counts timer ticks up to a limit and
//! reports every transition as an event.
//!
//! ## Public API
//!
//! ### Lifecycle (`lifecycle`)
//! - [`ServiceLifecycle`] - Start/pause/stop state machine with its timer
//! - [`RunState`] / [`StatusSnapshot`] - Read-only view of the service
//!
//! ### Configuration (`config`)
//! - [`ServiceConfig`] - Initial interval, tick limit and auto-start flag
//! - [`ConfigurationUpdate`] - Partial runtime reconfiguration
//!
//! ### Events (`events`)
//! - [`ServiceEvent`] - `status_change`, `counter_update`, `error` and custom
//!   events
//!
//! ### Commands (`command`, `dispatch`, `control`)
//! - [`ServiceCommand`] - Typed command decoded from `(method, params)`
//! - [`ServiceLifecycle::handle_request`] - Decode + execute with error
//!   mirroring
//! - [`ServiceControl`] - Async command surface shared with the client
//!
//! ### Client (`client`)
//! - [`ServiceClient`] - Request/response tracking over the line protocol

pub mod client;
pub mod command;
pub mod config;
pub mod control;
mod dispatch;
pub mod events;
pub mod lifecycle;
pub mod state;

pub use client::{
    RequestTracker, ServiceClient, DEFAULT_REQUEST_TIMEOUT, STALE_REQUEST_TIMEOUT,
};
pub use command::ServiceCommand;
pub use config::{ConfigurationUpdate, ServiceConfig};
pub use control::{LocalServiceControl, ServiceControl};
pub use events::{ServiceEvent, ServiceStatus};
pub use lifecycle::ServiceLifecycle;
pub use state::{RunState, StatusSnapshot};
