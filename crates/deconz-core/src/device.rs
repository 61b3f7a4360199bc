// ── Device operations ──
//
// Reads and writes against single lights and sensors. Each command runs
// one REST call and yields the gateway's JSON.

use deconz_api::{GatewayClient, LightStateUpdate};
use serde_json::Value;
use tracing::debug;

use crate::emit::{Emitter, emit_items};
use crate::error::CoreError;

/// One device operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    ReadLight { id: String },
    UpdateLight { id: String, update: LightStateUpdate },
    ReadSensor { id: String },
}

impl DeviceCommand {
    /// Run the command and return the resulting JSON.
    ///
    /// `UpdateLight` yields the applied attributes, e.g. `{"on": true, "bri": 100}`.
    pub async fn execute(&self, client: &GatewayClient) -> Result<Value, CoreError> {
        debug!(command = ?self, "executing device command");
        let value = match self {
            Self::ReadLight { id } => client.get_light(id).await?,
            Self::ReadSensor { id } => client.get_sensor(id).await?,
            Self::UpdateLight { id, update } => {
                Value::Object(client.set_light_state(id, update).await?)
            }
        };
        Ok(value)
    }

    /// Run the command and hand its output to `emitter`.
    pub async fn execute_and_emit(
        &self,
        client: &GatewayClient,
        emitter: &dyn Emitter,
    ) -> Result<(), CoreError> {
        let value = self.execute(client).await?;
        emit_items(emitter, value);
        Ok(())
    }
}
