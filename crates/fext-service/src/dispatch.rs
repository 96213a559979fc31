//! Command execution against a [`ServiceLifecycle`]

use serde_json::Value;

use crate::command::ServiceCommand;
use crate::lifecycle::ServiceLifecycle;
use fext_core::prelude::*;

impl ServiceLifecycle {
    /// Run a decoded command and return its JSON result
    #[instrument(level = "debug", skip(self), fields(method = command.method()))]
    pub fn execute(&self, command: ServiceCommand) -> Result<Value> {
        let result = match command {
            ServiceCommand::Start { interval } => Value::Bool(self.start(interval)?),
            ServiceCommand::Stop => Value::Bool(self.stop()?),
            ServiceCommand::Pause => Value::Bool(self.pause()?),
            ServiceCommand::GetStatus => serde_json::to_value(self.get_status())?,
            ServiceCommand::GetCounter => Value::from(self.counter()),
            ServiceCommand::ResetCounter => Value::Bool(self.reset_counter()?),
            ServiceCommand::SetConfiguration(update) => {
                Value::Bool(self.set_configuration(update)?)
            }
            ServiceCommand::TriggerCustomEvent { event_name, data } => {
                Value::Bool(self.trigger_custom_event(&event_name, data)?)
            }
        };
        Ok(result)
    }

    /// Decode and run a host request.
    ///
    /// Decode failures are mirrored onto the event feed here. Failures
    /// inside the lifecycle already emit their own `error` event, and a
    /// disposed service emits nothing.
    pub fn handle_request(&self, method: &str, params: &Value) -> Result<Value> {
        let command = match ServiceCommand::decode(method, params) {
            Ok(command) => command,
            Err(e) => {
                self.report_error(&e);
                return Err(e);
            }
        };
        self.execute(command)
    }
}
