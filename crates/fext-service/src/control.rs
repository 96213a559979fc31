//! Async command surface shared by the in-process service and the remote
//! client

use serde_json::{Map, Value};

use crate::config::ConfigurationUpdate;
use crate::lifecycle::ServiceLifecycle;
use crate::state::StatusSnapshot;
use fext_core::prelude::*;

/// Service control operations
///
/// Implemented by [`ServiceLifecycle`] for in-process use and by
/// [`ServiceClient`](crate::ServiceClient) over the line protocol, so host
/// code can be written once against either.
#[trait_variant::make(ServiceControl: Send)]
pub trait LocalServiceControl {
    /// Start, or resume from pause
    async fn start_service(&self, interval: Option<f64>) -> Result<bool>;

    async fn stop_service(&self) -> Result<bool>;

    async fn pause_service(&self) -> Result<bool>;

    async fn get_status(&self) -> Result<StatusSnapshot>;

    async fn get_counter(&self) -> Result<u64>;

    async fn reset_counter(&self) -> Result<bool>;

    async fn set_configuration(&self, update: ConfigurationUpdate) -> Result<bool>;

    async fn trigger_custom_event(
        &self,
        event_name: &str,
        data: Option<Map<String, Value>>,
    ) -> Result<bool>;
}

impl ServiceControl for ServiceLifecycle {
    async fn start_service(&self, interval: Option<f64>) -> Result<bool> {
        self.start(interval)
    }

    async fn stop_service(&self) -> Result<bool> {
        self.stop()
    }

    async fn pause_service(&self) -> Result<bool> {
        self.pause()
    }

    async fn get_status(&self) -> Result<StatusSnapshot> {
        Ok(ServiceLifecycle::get_status(self))
    }

    async fn get_counter(&self) -> Result<u64> {
        Ok(self.counter())
    }

    async fn reset_counter(&self) -> Result<bool> {
        ServiceLifecycle::reset_counter(self)
    }

    async fn set_configuration(&self, update: ConfigurationUpdate) -> Result<bool> {
        ServiceLifecycle::set_configuration(self, update)
    }

    async fn trigger_custom_event(
        &self,
        event_name: &str,
        data: Option<Map<String, Value>>,
    ) -> Result<bool> {
        ServiceLifecycle::trigger_custom_event(self, event_name, data)
    }
}
