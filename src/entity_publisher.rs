use crate::config::ConfigEntry;
use crate::errors::NetMeterResult;
use crate::home_assistant::HomeAssistantAPI;
use crate::net_meter::DerivedState;
use crate::sensor_descriptions::SENSOR_TYPES;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Writes the derived sensors back into Home Assistant
pub struct EntityPublisher {
    device_name: String,
    device_unique_id: String,
    ha_client: HomeAssistantAPI,
}

impl EntityPublisher {
    pub fn new(ha_client: HomeAssistantAPI, entry: &ConfigEntry) -> Self {
        for description in SENSOR_TYPES {
            info!(
                "Publishing {} as {}",
                description.name,
                description.entity_id(&entry.name)
            );
        }
        Self {
            device_name: entry.name.clone(),
            device_unique_id: entry.unique_id.clone(),
            ha_client,
        }
    }

    pub fn spawn(mut self, mut state_receiver: Receiver<DerivedState>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(state) = state_receiver.recv().await {
                if let Err(e) = self.publish(&state).await {
                    warn!("Failed to publish net meter state: {e}");
                }
            }
            info!("Entity publisher exiting");
        })
    }

    /// Publishes all six sensors. Stops at the first failure.
    pub async fn publish(&mut self, state: &DerivedState) -> NetMeterResult<()> {
        for description in SENSOR_TYPES {
            let entity_id = description.entity_id(&self.device_name);
            let value = description.value(state);
            self.ha_client
                .publish_state(
                    &entity_id,
                    &value.to_string(),
                    description.attributes(&self.device_name, &self.device_unique_id),
                )
                .await?;
            debug!("{entity_id} = {value}");
        }
        Ok(())
    }
}
