//! Net Meter Library
//!
//! Derives a virtual net energy meter (import, export and consumption power and
//! energy) from six existing Home Assistant sensors and publishes the results
//! back to Home Assistant as new sensor entities.

pub mod config;
pub mod entity_publisher;
pub mod errors;
pub mod home_assistant;
pub mod net_meter;
pub mod sensor_descriptions;
pub mod setup_wizard;
pub mod source_reader;
pub mod source_readings;
pub mod update_coordinator;

// Re-export commonly used types for easier access
pub use config::{ConfigEntry, ServiceConfig, SourceEntities};
pub use errors::{NetMeterError, NetMeterResult};
pub use home_assistant::HomeAssistantAPI;
pub use net_meter::{derive_power, DerivedState, NetMeter};
pub use setup_wizard::{SetupForm, SetupWizard};
pub use update_coordinator::NetMeterCoordinator;
