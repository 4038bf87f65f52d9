//! Flat energy-saving logic module
//!
//! Older variant of the energy-saving controller: one network-wide
//! efficiency (all delivered bits over the energy spent by all base stations)
//! and the same power step broadcast to every base station that reported
//! energy.

use std::collections::HashMap;

use tracing::{debug, info};

use oransim_common::{FlatEnergySavingConfig, NodeId, NodeType, RandomVariable, SimTime};

use crate::command::Command;
use crate::error::RicError;
use crate::lm::energy_saving::{classify, total_rx_bits, PowerAdjustment};
use crate::lm::LogicModule;
use crate::repository::DataRepository;

/// Network-wide energy-saving logic module
#[derive(Debug)]
pub struct FlatEnergySavingLm {
    config: FlatEnergySavingConfig,
    prev_total_bits: Option<f64>,
    prev_remaining_j: HashMap<NodeId, f64>,
}

impl FlatEnergySavingLm {
    /// Module name
    pub const NAME: &'static str = "flat_energy_saving";

    /// Creates the module
    pub fn new(config: FlatEnergySavingConfig) -> Result<Self, RicError> {
        config.controller.validate()?;
        Ok(Self {
            config,
            prev_total_bits: None,
            prev_remaining_j: HashMap::new(),
        })
    }
}

impl LogicModule for FlatEnergySavingLm {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn processing_delay(&self) -> &RandomVariable {
        &self.config.controller.processing_delay
    }

    fn reset(&mut self) {
        self.prev_total_bits = None;
        self.prev_remaining_j.clear();
    }

    fn run(&mut self, now: SimTime, data: &mut DataRepository) -> Vec<Command> {
        let total_bits = total_rx_bits(data, now);
        let prev_bits = self.prev_total_bits.replace(total_bits);

        let mut spent_j = 0.0;
        let mut reporting = Vec::new();
        for enb in data.node_ids(NodeType::BaseStation) {
            let Some(remaining) = data.latest_energy_remaining(enb, now) else {
                continue;
            };
            if let Some(prev) = self.prev_remaining_j.insert(enb, remaining) {
                spent_j += prev - remaining;
            }
            reporting.push(enb);
        }

        let Some(prev_bits) = prev_bits else {
            debug!("Flat energy saving warm-up at {}", now);
            return Vec::new();
        };
        let delta_bits = total_bits - prev_bits;
        if delta_bits <= 0.0 || spent_j <= 0.0 {
            debug!(
                "Flat energy saving: skipping (delta_bits={:.0}, spent={:.6} J)",
                delta_bits, spent_j
            );
            return Vec::new();
        }

        let controller = &self.config.controller;
        let efficiency = delta_bits / spent_j;
        let delta_db = match classify(efficiency, controller) {
            PowerAdjustment::Raise => controller.step_size_db,
            PowerAdjustment::Lower => -controller.step_size_db,
            PowerAdjustment::Hold => return Vec::new(),
        };
        info!(
            "Network efficiency {:.3} bits/J vs target {:.3}, power {:+.1} dB on {} base stations",
            efficiency,
            controller.target_efficiency_bits_per_joule,
            delta_db,
            reporting.len()
        );
        reporting
            .into_iter()
            .map(|enb| {
                let command = Command::tx_power_delta(enb, delta_db);
                data.log_command_lm(Self::NAME, &command, now);
                command
            })
            .collect()
    }
}
