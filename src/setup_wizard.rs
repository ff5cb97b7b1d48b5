//! Setup flow that turns user input into a persisted [`ConfigEntry`].
//!
//! The form can be filled interactively or imported from environment
//! variables. Either way the six source entities must exist and report
//! numeric states before an entry is created.

use crate::config::{ConfigEntry, SourceEntities, DEFAULT_NAME};
use crate::errors::{NetMeterError, NetMeterResult};
use crate::home_assistant::HomeAssistantAPI;
use crate::sensor_descriptions::slugify;
use crate::source_readings::SourceReadings;
use std::env;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{error, info, warn};

/// User supplied setup values before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupForm {
    pub name: String,
    pub sources: SourceEntities,
}

impl Default for SetupForm {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            sources: SourceEntities::default(),
        }
    }
}

impl SetupForm {
    /// Imports the form from `NET_METER_*` environment variables
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).unwrap_or_default().trim().to_string();
        let name = var("NET_METER_NAME");
        Self {
            name: if name.is_empty() {
                DEFAULT_NAME.to_string()
            } else {
                name
            },
            sources: SourceEntities {
                gen_amp_entity: var("NET_METER_GEN_AMP_ENTITY"),
                con_amp_entity: var("NET_METER_CON_AMP_ENTITY"),
                flow_power_entity: var("NET_METER_FLOW_POWER_ENTITY"),
                flow_energy_entity: var("NET_METER_FLOW_ENERGY_ENTITY"),
                gen_power_entity: var("NET_METER_GEN_POWER_ENTITY"),
                gen_energy_entity: var("NET_METER_GEN_ENERGY_ENTITY"),
            },
        }
    }

    /// Asks for every field in turn. An empty answer keeps the shown default.
    pub fn prompt<R: BufRead, W: Write>(
        defaults: &SetupForm,
        input: &mut R,
        output: &mut W,
    ) -> NetMeterResult<Self> {
        let name = ask(input, output, "Name", &defaults.name)?;
        let d = &defaults.sources;
        let sources = SourceEntities {
            gen_amp_entity: ask(input, output, "Generation amperage entity", &d.gen_amp_entity)?,
            con_amp_entity: ask(input, output, "Consumption amperage entity", &d.con_amp_entity)?,
            flow_power_entity: ask(input, output, "Flow power entity", &d.flow_power_entity)?,
            flow_energy_entity: ask(input, output, "Flow energy entity", &d.flow_energy_entity)?,
            gen_power_entity: ask(input, output, "Generation power entity", &d.gen_power_entity)?,
            gen_energy_entity: ask(
                input,
                output,
                "Generation energy entity",
                &d.gen_energy_entity,
            )?,
        };
        Ok(Self { name, sources })
    }

    fn validate(&self) -> NetMeterResult<()> {
        if self.name.trim().is_empty() {
            return Err(NetMeterError::Config("Name must not be empty".to_string()));
        }
        for (label, entity_id) in self.sources.labelled() {
            if entity_id.trim().is_empty() {
                return Err(NetMeterError::Config(format!(
                    "Enter your {label} entity"
                )));
            }
        }
        Ok(())
    }
}

fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: &str,
) -> NetMeterResult<String> {
    if default.is_empty() {
        write!(output, "{label}: ")?;
    } else {
        write!(output, "{label} [{default}]: ")?;
    }
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

/// Checks that every source entity exists and currently reports a number
pub async fn authenticate(
    api: &mut HomeAssistantAPI,
    sources: &SourceEntities,
) -> NetMeterResult<SourceReadings> {
    SourceReadings::fetch(api, sources).await.map_err(|e| {
        error!("Failed: {e}");
        NetMeterError::AuthFailed(e.to_string())
    })
}

pub struct SetupWizard {
    api: HomeAssistantAPI,
}

impl SetupWizard {
    pub fn new(api: HomeAssistantAPI) -> Self {
        Self { api }
    }

    /// Validates the form against Home Assistant and creates the entry
    pub async fn submit(&mut self, form: SetupForm) -> NetMeterResult<ConfigEntry> {
        form.validate()?;
        authenticate(&mut self.api, &form.sources).await?;

        let name = form.name.trim().to_string();
        let entry = ConfigEntry {
            unique_id: slugify(&name),
            name,
            sources: form.sources,
        };
        info!("Created net meter entry '{}'", entry.name);
        Ok(entry)
    }
}

/// Loads the saved entry, or imports one from the environment when none exists
pub async fn load_or_import(
    api: HomeAssistantAPI,
    entry_path: &Path,
) -> NetMeterResult<ConfigEntry> {
    if entry_path.exists() {
        return ConfigEntry::load(entry_path);
    }

    warn!(
        "No entry at {}, importing setup from environment",
        entry_path.display()
    );
    let entry = SetupWizard::new(api).submit(SetupForm::from_env()).await?;
    entry.save(entry_path)?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn filled_form() -> SetupForm {
        SetupForm {
            name: "Roof Meter".to_string(),
            sources: SourceEntities {
                gen_amp_entity: "sensor.solar_current".to_string(),
                con_amp_entity: "sensor.house_current".to_string(),
                flow_power_entity: "sensor.grid_power".to_string(),
                flow_energy_entity: "sensor.grid_energy".to_string(),
                gen_power_entity: "sensor.solar_power".to_string(),
                gen_energy_entity: "sensor.solar_energy".to_string(),
            },
        }
    }

    async fn mock_all_sources(server: &mut mockito::Server, flow_power_state: &str) {
        for (entity_id, state) in [
            ("sensor.solar_current", "10"),
            ("sensor.house_current", "6"),
            ("sensor.grid_power", flow_power_state),
            ("sensor.grid_energy", "12.5"),
            ("sensor.solar_power", "500"),
            ("sensor.solar_energy", "30"),
        ] {
            server
                .mock("GET", format!("/api/states/{entity_id}").as_str())
                .with_status(200)
                .with_body(format!(
                    r#"{{"entity_id": "{entity_id}", "state": "{state}"}}"#
                ))
                .create_async()
                .await;
        }
    }

    #[test]
    fn test_prompt_uses_answers_and_defaults() {
        let defaults = SetupForm {
            sources: SourceEntities {
                flow_energy_entity: "sensor.grid_energy".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let answers = "\nsensor.a\nsensor.b\nsensor.c\n\nsensor.e\nsensor.f\n";
        let mut input = Cursor::new(answers.as_bytes());
        let mut output = Vec::new();

        let form = SetupForm::prompt(&defaults, &mut input, &mut output).unwrap();

        assert_eq!(form.name, "Net Meter");
        assert_eq!(form.sources.gen_amp_entity, "sensor.a");
        assert_eq!(form.sources.flow_energy_entity, "sensor.grid_energy");
        assert_eq!(form.sources.gen_energy_entity, "sensor.f");

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Name [Net Meter]: "));
        assert!(shown.contains("Flow energy entity [sensor.grid_energy]: "));
        assert!(shown.contains("Generation amperage entity: "));
    }

    #[test]
    fn test_validate_rejects_blank_entities() {
        let mut form = filled_form();
        form.sources.con_amp_entity = "  ".to_string();
        let err = form.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Enter your consumption amperage entity"
        );
    }

    #[tokio::test]
    async fn test_submit_creates_entry() {
        let mut server = mockito::Server::new_async().await;
        mock_all_sources(&mut server, "-200").await;

        let mut wizard = SetupWizard::new(HomeAssistantAPI::new(server.url(), "token"));
        let entry = wizard.submit(filled_form()).await.unwrap();

        assert_eq!(entry.name, "Roof Meter");
        assert_eq!(entry.unique_id, "roof_meter");
        assert_eq!(entry.sources, filled_form().sources);
    }

    #[tokio::test]
    async fn test_submit_rejects_non_numeric_source() {
        let mut server = mockito::Server::new_async().await;
        mock_all_sources(&mut server, "unavailable").await;

        let mut wizard = SetupWizard::new(HomeAssistantAPI::new(server.url(), "token"));
        let result = wizard.submit(filled_form()).await;

        assert!(matches!(result, Err(NetMeterError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_form_without_contacting_ha() {
        let mut wizard = SetupWizard::new(HomeAssistantAPI::new("", ""));
        let result = wizard.submit(SetupForm::default()).await;

        assert!(matches!(result, Err(NetMeterError::Config(_))));
    }
}
