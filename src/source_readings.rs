use crate::config::SourceEntities;
use crate::errors::{NetMeterError, NetMeterResult};
use crate::home_assistant::{HASensor, HomeAssistantAPI};

const STATE_UNAVAILABLE: &str = "unavailable";
const STATE_UNKNOWN: &str = "unknown";

/// One snapshot of all six source sensors
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SourceReadings {
    pub gen_amp: f64,
    pub con_amp: f64,
    pub gen_power: f64,
    pub gen_energy: f64,
    pub flow_power: f64,
    pub flow_energy: f64,
}

impl SourceReadings {
    /// Reads every source entity. Any failure aborts the whole snapshot.
    pub async fn fetch(
        api: &mut HomeAssistantAPI,
        sources: &SourceEntities,
    ) -> NetMeterResult<Self> {
        Ok(Self {
            gen_amp: read_number(api, &sources.gen_amp_entity).await?,
            con_amp: read_number(api, &sources.con_amp_entity).await?,
            gen_power: read_number(api, &sources.gen_power_entity).await?,
            gen_energy: read_number(api, &sources.gen_energy_entity).await?,
            flow_power: read_number(api, &sources.flow_power_entity).await?,
            flow_energy: read_number(api, &sources.flow_energy_entity).await?,
        })
    }
}

async fn read_number(api: &mut HomeAssistantAPI, entity_id: &str) -> NetMeterResult<f64> {
    match api.read_sensor_value(entity_id).await {
        Ok(sensor) => parse_sensor_state(&sensor),
        Err(e) => Err(NetMeterError::not_ready(entity_id, e.to_string())),
    }
}

/// Parses a sensor state into a number, treating placeholder states as not ready
pub fn parse_sensor_state(sensor: &HASensor) -> NetMeterResult<f64> {
    let state = sensor.state.trim();
    if state.is_empty() {
        return Err(NetMeterError::not_ready(&sensor.entity_id, "empty state"));
    }
    if state.eq_ignore_ascii_case(STATE_UNAVAILABLE) || state.eq_ignore_ascii_case(STATE_UNKNOWN)
    {
        return Err(NetMeterError::not_ready(
            &sensor.entity_id,
            format!("state is {state}"),
        ));
    }
    match state.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(NetMeterError::not_ready(
            &sensor.entity_id,
            format!("'{state}' is not numeric"),
        )),
    }
}
