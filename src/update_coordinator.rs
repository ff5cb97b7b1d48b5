use crate::config::ConfigEntry;
use crate::entity_publisher::EntityPublisher;
use crate::home_assistant::HomeAssistantAPI;
use crate::net_meter::{DerivedState, NetMeter};
use crate::source_reader::SourceReader;
use crate::source_readings::SourceReadings;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::info;

/// Runs the poll, derive, publish pipeline for one config entry.
///
/// Each stage is its own task. The net meter stage is the only owner of the
/// derived state, so no locking is needed.
pub struct NetMeterCoordinator {
    tasks: Vec<JoinHandle<()>>,
}

impl NetMeterCoordinator {
    /// Starts all tasks. `baseline` is the snapshot taken during authentication.
    pub fn start(
        ha_client: HomeAssistantAPI,
        entry: &ConfigEntry,
        update_interval: Duration,
        baseline: Option<SourceReadings>,
    ) -> Self {
        info!("Initializing net meter coordinator for '{}'", entry.name);

        let (readings_tx, readings_rx) = mpsc::channel::<SourceReadings>(32);
        let (state_tx, state_rx) = mpsc::channel::<DerivedState>(32);

        let mut meter = NetMeter::new();
        if let Some(baseline) = baseline {
            meter.prime(&baseline);
        }

        let publisher = EntityPublisher::new(ha_client.clone(), entry).spawn(state_rx);
        let deriver = Self::spawn_meter(meter, readings_rx, state_tx);
        let reader = SourceReader::new(
            ha_client,
            entry.sources.clone(),
            update_interval,
            readings_tx,
        )
        .spawn();

        info!("All net meter tasks started");

        Self {
            tasks: vec![reader, deriver, publisher],
        }
    }

    fn spawn_meter(
        mut meter: NetMeter,
        mut readings_receiver: Receiver<SourceReadings>,
        state_sender: Sender<DerivedState>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(readings) = readings_receiver.recv().await {
                let state = *meter.update(&readings);
                if state_sender.send(state).await.is_err() {
                    break;
                }
            }
            info!("Net meter task exiting");
        })
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Stops every task and waits for them to end. Equivalent of unloading the entry.
    pub async fn shutdown(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in &mut self.tasks {
            let _ = task.await;
        }
        info!("Net meter coordinator stopped");
    }
}
