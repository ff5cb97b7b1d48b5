//! Net meter derivation.
//!
//! Compares generation and consumption amperage to decide which way current
//! flows through the grid connection, then splits the bidirectional flow
//! readings into separate import and export figures.

use crate::source_readings::SourceReadings;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    Importing,
    Exporting,
}

impl FlowDirection {
    /// The site exports only while generation current exceeds consumption current
    pub fn from_amperage(gen_amp: f64, con_amp: f64) -> Self {
        if gen_amp > con_amp {
            FlowDirection::Exporting
        } else {
            FlowDirection::Importing
        }
    }
}

/// Power split for a single cycle, in watts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerFlow {
    pub direction: FlowDirection,
    pub consumption: f64,
    pub import: f64,
    pub export: f64,
}

pub fn derive_power(gen_amp: f64, con_amp: f64, gen_power: f64, flow_power: f64) -> PowerFlow {
    let direction = FlowDirection::from_amperage(gen_amp, con_amp);
    match direction {
        FlowDirection::Exporting => {
            let exported = -flow_power;
            PowerFlow {
                direction,
                consumption: gen_power - exported,
                import: 0.0,
                export: exported,
            }
        }
        FlowDirection::Importing => PowerFlow {
            direction,
            consumption: gen_power + flow_power,
            import: flow_power,
            export: 0.0,
        },
    }
}

/// Derived values published as sensors. Energies are kWh totals since start.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedState {
    pub consumption_power: f64,
    pub import_power: f64,
    pub export_power: f64,
    pub consumption_energy: f64,
    pub import_energy: f64,
    pub export_energy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EnergyBaseline {
    generation: f64,
    flow: f64,
}

#[derive(Debug, Default)]
pub struct NetMeter {
    state: DerivedState,
    baseline: Option<EnergyBaseline>,
}

impl NetMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the energy counters without producing output
    pub fn prime(&mut self, readings: &SourceReadings) {
        info!(
            "Energy baseline: generation {} kWh, flow {} kWh",
            readings.gen_energy, readings.flow_energy
        );
        self.baseline = Some(EnergyBaseline {
            generation: readings.gen_energy,
            flow: readings.flow_energy,
        });
    }

    pub fn state(&self) -> &DerivedState {
        &self.state
    }

    /// Recomputes the derived state from a complete set of readings
    pub fn update(&mut self, readings: &SourceReadings) -> &DerivedState {
        let power = derive_power(
            readings.gen_amp,
            readings.con_amp,
            readings.gen_power,
            readings.flow_power,
        );
        self.state.consumption_power = power.consumption;
        self.state.import_power = power.import;
        self.state.export_power = power.export;

        self.accumulate_energy(power.direction, readings);

        debug!(
            "Derived {:?}: consumption {}W, import {}W, export {}W",
            power.direction, power.consumption, power.import, power.export
        );
        &self.state
    }

    fn accumulate_energy(&mut self, direction: FlowDirection, readings: &SourceReadings) {
        let Some(baseline) = self.baseline.replace(EnergyBaseline {
            generation: readings.gen_energy,
            flow: readings.flow_energy,
        }) else {
            return;
        };

        let generated = counter_delta(baseline.generation, readings.gen_energy);
        // Net grid counter: rises while importing, falls while exporting
        let flowed = readings.flow_energy - baseline.flow;

        match direction {
            FlowDirection::Importing => self.state.import_energy += flowed.max(0.0),
            FlowDirection::Exporting => self.state.export_energy += (-flowed).max(0.0),
        }
        self.state.consumption_energy += (generated + flowed).max(0.0);
    }
}

/// Increase of a cumulative counter. A decrease means the counter was reset.
fn counter_delta(previous: f64, current: f64) -> f64 {
    if current < previous {
        debug!("Energy counter reset from {previous} to {current}");
        0.0
    } else {
        current - previous
    }
}
