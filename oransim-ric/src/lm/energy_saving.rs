//! Energy-saving logic module
//!
//! Closed-loop transmit power control driven by energy efficiency. On each
//! query the module takes the bits delivered since the previous query
//! (cumulative received application bytes of all UEs, times 8) and, per base
//! station, the energy spent since the previous query (drop in remaining
//! energy). Efficiency `bits / joules` below the target band raises power by
//! one step, above it lowers power by one step, inside it does nothing.
//!
//! The first query after a reset only records baselines.

use std::collections::HashMap;

use tracing::{debug, info};

use oransim_common::{EnergySavingConfig, NodeId, NodeType, RandomVariable, SimTime};

use crate::command::Command;
use crate::error::RicError;
use crate::lm::LogicModule;
use crate::repository::DataRepository;

/// Direction of a power adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAdjustment {
    /// Increase transmit power
    Raise,
    /// Decrease transmit power
    Lower,
    /// Leave unchanged
    Hold,
}

/// Classifies an efficiency against the target band `target ± epsilon`
pub fn classify(efficiency: f64, config: &EnergySavingConfig) -> PowerAdjustment {
    let target = config.target_efficiency_bits_per_joule;
    if efficiency < target - config.epsilon {
        PowerAdjustment::Raise
    } else if efficiency > target + config.epsilon {
        PowerAdjustment::Lower
    } else {
        PowerAdjustment::Hold
    }
}

/// Total bits received by all registered UEs as of `now`
pub fn total_rx_bits(data: &DataRepository, now: SimTime) -> f64 {
    data.node_ids(NodeType::MobileUnit)
        .into_iter()
        .filter_map(|ue| data.latest_app_counters(ue, now))
        .map(|c| c.rx_bytes as f64 * 8.0)
        .sum()
}

/// Per-base-station energy-saving logic module
#[derive(Debug)]
pub struct EnergySavingLm {
    config: EnergySavingConfig,
    prev_total_bits: Option<f64>,
    prev_remaining_j: HashMap<NodeId, f64>,
}

impl EnergySavingLm {
    /// Module name
    pub const NAME: &'static str = "energy_saving";

    /// Creates the module
    pub fn new(config: EnergySavingConfig) -> Result<Self, RicError> {
        config.validate()?;
        Ok(Self {
            config,
            prev_total_bits: None,
            prev_remaining_j: HashMap::new(),
        })
    }

    fn is_warming_up(&self) -> bool {
        self.prev_total_bits.is_none()
    }
}

impl LogicModule for EnergySavingLm {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn processing_delay(&self) -> &RandomVariable {
        &self.config.processing_delay
    }

    fn reset(&mut self) {
        self.prev_total_bits = None;
        self.prev_remaining_j.clear();
    }

    fn run(&mut self, now: SimTime, data: &mut DataRepository) -> Vec<Command> {
        let total_bits = total_rx_bits(data, now);
        let enbs = data.node_ids(NodeType::BaseStation);

        if self.is_warming_up() {
            for enb in enbs {
                if let Some(remaining) = data.latest_energy_remaining(enb, now) {
                    self.prev_remaining_j.insert(enb, remaining);
                }
            }
            self.prev_total_bits = Some(total_bits);
            debug!("Energy saving warm-up at {}: {:.0} bits delivered so far", now, total_bits);
            return Vec::new();
        }
        let prev_bits = self.prev_total_bits.replace(total_bits).unwrap_or(total_bits);
        let delta_bits = total_bits - prev_bits;

        let mut commands = Vec::new();
        for enb in enbs {
            let Some(remaining) = data.latest_energy_remaining(enb, now) else {
                debug!("Base station {}: no energy samples", enb);
                continue;
            };
            let Some(prev) = self.prev_remaining_j.insert(enb, remaining) else {
                continue;
            };
            let delta_j = prev - remaining;
            if delta_j <= 0.0 || delta_bits <= 0.0 {
                debug!(
                    "Base station {}: skipping (delta_bits={:.0}, delta_j={:.6})",
                    enb, delta_bits, delta_j
                );
                continue;
            }
            let efficiency = delta_bits / delta_j;
            let delta_db = match classify(efficiency, &self.config) {
                PowerAdjustment::Raise => self.config.step_size_db,
                PowerAdjustment::Lower => -self.config.step_size_db,
                PowerAdjustment::Hold => continue,
            };
            info!(
                "Base station {}: efficiency {:.3} bits/J vs target {:.3}, power {:+.1} dB",
                enb, efficiency, self.config.target_efficiency_bits_per_joule, delta_db
            );
            let command = Command::tx_power_delta(enb, delta_db);
            data.log_command_lm(Self::NAME, &command, now);
            commands.push(command);
        }
        commands
    }
}
