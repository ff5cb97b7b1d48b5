use crate::config::SourceEntities;
use crate::home_assistant::HomeAssistantAPI;
use crate::source_readings::SourceReadings;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Polls the six source sensors on a fixed schedule
pub struct SourceReader {
    sources: SourceEntities,
    update_interval: Duration,
    update_sender: Sender<SourceReadings>,
    ha_client: HomeAssistantAPI,
}

impl SourceReader {
    pub fn new(
        ha_client: HomeAssistantAPI,
        sources: SourceEntities,
        update_interval: Duration,
        update_sender: Sender<SourceReadings>,
    ) -> Self {
        info!("Source reader config:");
        for (label, entity_id) in sources.labelled() {
            info!("  {label}: {entity_id}");
        }
        info!("  Interval: {}ms", update_interval.as_millis());

        Self {
            sources,
            update_interval,
            update_sender,
            ha_client,
        }
    }

    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&mut self) {
        info!("Starting source reader");

        let mut read_interval = interval(self.update_interval);
        read_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            read_interval.tick().await;

            match SourceReadings::fetch(&mut self.ha_client, &self.sources).await {
                Ok(readings) => {
                    if self.update_sender.send(readings).await.is_err() {
                        info!("Net meter stopped listening. Shutting down source reader.");
                        break;
                    }
                }
                // The next tick is the retry
                Err(e) => warn!("Skipping update: {e}"),
            }
        }
    }
}
