use crate::net_meter::DerivedState;
use serde_json::{json, Map, Value};

pub const UNIT_WATT: &str = "W";
pub const UNIT_KILO_WATT_HOUR: &str = "kWh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKey {
    ConsumptionPower,
    ConsumptionEnergy,
    ExportPower,
    ExportEnergy,
    ImportPower,
    ImportEnergy,
}

impl SensorKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKey::ConsumptionPower => "consumption_power",
            SensorKey::ConsumptionEnergy => "consumption_energy",
            SensorKey::ExportPower => "export_power",
            SensorKey::ExportEnergy => "export_energy",
            SensorKey::ImportPower => "import_power",
            SensorKey::ImportEnergy => "import_energy",
        }
    }
}

/// Static metadata of one published sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    pub key: SensorKey,
    pub name: &'static str,
    pub unit: &'static str,
    pub device_class: &'static str,
    pub state_class: &'static str,
    pub icon: &'static str,
}

pub const SENSOR_TYPES: [SensorDescription; 6] = [
    SensorDescription {
        key: SensorKey::ConsumptionPower,
        name: "Consumption Power",
        unit: UNIT_WATT,
        device_class: "power",
        state_class: "measurement",
        icon: "mdi:flash-outline",
    },
    SensorDescription {
        key: SensorKey::ConsumptionEnergy,
        name: "Consumed Energy",
        unit: UNIT_KILO_WATT_HOUR,
        device_class: "energy",
        state_class: "total_increasing",
        icon: "mdi:transmission-tower-export",
    },
    SensorDescription {
        key: SensorKey::ExportPower,
        name: "Export Power",
        unit: UNIT_WATT,
        device_class: "power",
        state_class: "measurement",
        icon: "mdi:flash",
    },
    SensorDescription {
        key: SensorKey::ExportEnergy,
        name: "Exported Energy",
        unit: UNIT_KILO_WATT_HOUR,
        device_class: "energy",
        state_class: "total_increasing",
        icon: "mdi:transmission-tower-import",
    },
    SensorDescription {
        key: SensorKey::ImportPower,
        name: "Import Power",
        unit: UNIT_WATT,
        device_class: "power",
        state_class: "measurement",
        icon: "mdi:flash-outline",
    },
    SensorDescription {
        key: SensorKey::ImportEnergy,
        name: "Imported Energy",
        unit: UNIT_KILO_WATT_HOUR,
        device_class: "energy",
        state_class: "total_increasing",
        icon: "mdi:transmission-tower-export",
    },
];

impl SensorDescription {
    pub fn entity_id(&self, device_name: &str) -> String {
        format!("sensor.{}_{}", slugify(device_name), self.key.as_str())
    }

    pub fn value(&self, state: &DerivedState) -> f64 {
        let raw = match self.key {
            SensorKey::ConsumptionPower => state.consumption_power,
            SensorKey::ConsumptionEnergy => state.consumption_energy,
            SensorKey::ExportPower => state.export_power,
            SensorKey::ExportEnergy => state.export_energy,
            SensorKey::ImportPower => state.import_power,
            SensorKey::ImportEnergy => state.import_energy,
        };
        round_2dp(raw)
    }

    /// Attributes Home Assistant uses to render the sensor
    pub fn attributes(&self, device_name: &str, device_unique_id: &str) -> Map<String, Value> {
        let mut attributes = Map::new();
        attributes.insert(
            "friendly_name".to_string(),
            json!(format!("{} {}", device_name, self.name)),
        );
        attributes.insert("unit_of_measurement".to_string(), json!(self.unit));
        attributes.insert("device_class".to_string(), json!(self.device_class));
        attributes.insert("state_class".to_string(), json!(self.state_class));
        attributes.insert("icon".to_string(), json!(self.icon));
        attributes.insert("device_name".to_string(), json!(device_name));
        attributes.insert(
            "unique_id".to_string(),
            json!(format!("{}/{}", device_unique_id, self.name)),
        );
        attributes
    }
}

fn round_2dp(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid publishing "-0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Lowercases and replaces runs of non-alphanumeric characters with `_`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        "net_meter".to_string()
    } else {
        slug
    }
}
