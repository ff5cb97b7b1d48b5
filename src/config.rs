use crate::errors::{NetMeterError, NetMeterResult};
use crate::home_assistant::HomeAssistantAPI;
use serde_derive::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_NAME: &str = "Net Meter";
pub const DEFAULT_ENTRY_PATH: &str = "net_meter_entry.json";
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// The six Home Assistant entities the net meter derives from
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntities {
    pub gen_amp_entity: String,
    pub con_amp_entity: String,
    pub flow_power_entity: String,
    pub flow_energy_entity: String,
    pub gen_power_entity: String,
    pub gen_energy_entity: String,
}

impl SourceEntities {
    /// Field label and entity id pairs, in setup form order
    pub fn labelled(&self) -> [(&'static str, &str); 6] {
        [
            ("generation amperage", self.gen_amp_entity.as_str()),
            ("consumption amperage", self.con_amp_entity.as_str()),
            ("flow power", self.flow_power_entity.as_str()),
            ("flow energy", self.flow_energy_entity.as_str()),
            ("generation power", self.gen_power_entity.as_str()),
            ("generation energy", self.gen_energy_entity.as_str()),
        ]
    }
}

/// Setup result persisted between runs. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub unique_id: String,
    #[serde(flatten)]
    pub sources: SourceEntities,
}

impl ConfigEntry {
    pub fn load(path: &Path) -> NetMeterResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> NetMeterResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Runtime settings for the service, read from the environment
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub ha_client: HomeAssistantAPI,
    pub entry_path: PathBuf,
    pub update_interval: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> NetMeterResult<Self> {
        let ha_client = HomeAssistantAPI::from_env()?;
        let entry_path = env::var("NET_METER_ENTRY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ENTRY_PATH));
        let update_interval = match env::var("NET_METER_INTERVAL_MS") {
            Ok(raw) => parse_interval(&raw)?,
            Err(_) => DEFAULT_UPDATE_INTERVAL,
        };

        Ok(Self {
            ha_client,
            entry_path,
            update_interval,
        })
    }

    pub fn ha_api(&self) -> HomeAssistantAPI {
        self.ha_client.clone()
    }
}

pub(crate) fn required_var(name: &str) -> NetMeterResult<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(NetMeterError::Config(format!(
            "{name} environment variable not set"
        ))),
    }
}

fn parse_interval(raw: &str) -> NetMeterResult<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(NetMeterError::Config(
            "NET_METER_INTERVAL_MS must be greater than zero".to_string(),
        )),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(e) => Err(NetMeterError::Config(format!(
            "Invalid NET_METER_INTERVAL_MS '{raw}': {e}"
        ))),
    }
}
