//! RSRP handover logic module
//!
//! For every registered UE, averages the RSRP of each measured cell over the
//! last `time_window_s` and hands the UE over to the strongest cell when it
//! beats the serving cell by at least the hysteresis margin. A UE that was
//! handed over less than `hold_off_s` ago is left alone.
//!
//! The command goes to the base station serving the UE, carrying the UE's
//! RNTI in that cell and the target cell id.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tracing::{debug, info};

use oransim_common::{CellId, NodeId, NodeType, RandomVariable, RsrpHandoverConfig, SimTime};

use crate::command::Command;
use crate::error::RicError;
use crate::lm::LogicModule;
use crate::repository::DataRepository;

/// Handover decision for one UE
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandoverDecision {
    /// Serving cell
    pub serving_cell: CellId,
    /// Average serving-cell RSRP (dBm)
    pub serving_rsrp: f64,
    /// Strongest cell
    pub best_cell: CellId,
    /// Average RSRP of the strongest cell (dBm)
    pub best_rsrp: f64,
}

impl HandoverDecision {
    /// Returns true if the best cell clears the margin
    pub fn exceeds(&self, margin_db: f64) -> bool {
        self.best_cell != self.serving_cell && self.best_rsrp - self.serving_rsrp >= margin_db
    }
}

/// RSRP-based handover logic module
#[derive(Debug)]
pub struct RsrpHandoverLm {
    config: RsrpHandoverConfig,
    last_handover: HashMap<NodeId, SimTime>,
}

impl RsrpHandoverLm {
    /// Module name
    pub const NAME: &'static str = "rsrp_handover";

    /// Creates the module
    pub fn new(config: RsrpHandoverConfig) -> Result<Self, RicError> {
        config.validate()?;
        Ok(Self {
            config,
            last_handover: HashMap::new(),
        })
    }

    /// Time of the last handover issued for `ue`
    pub fn last_handover(&self, ue: NodeId) -> Option<SimTime> {
        self.last_handover.get(&ue).copied()
    }

    /// Windowed averages for one UE, or `None` if the serving cell has no
    /// sample in the window
    pub fn evaluate(
        &self,
        ue: NodeId,
        now: SimTime,
        data: &DataRepository,
    ) -> Option<HandoverDecision> {
        let serving = data.latest_ue_cell_info(ue, now)?;
        let window = Duration::from_secs_f64(self.config.time_window_s);
        let samples = data.get_rsrp_rsrq(ue, now.saturating_sub(window), now);

        let mut sums: BTreeMap<CellId, (f64, u32)> = BTreeMap::new();
        for (_, m) in &samples {
            let entry = sums.entry(m.cell_id).or_insert((0.0, 0));
            entry.0 += m.rsrp;
            entry.1 += 1;
        }
        let averages: BTreeMap<CellId, f64> = sums
            .into_iter()
            .map(|(cell, (sum, n))| (cell, sum / f64::from(n)))
            .collect();

        let serving_rsrp = *averages.get(&serving.cell_id)?;
        // Ties go to the lowest cell id
        let (best_cell, best_rsrp) = averages
            .iter()
            .fold(None, |best: Option<(CellId, f64)>, (&cell, &avg)| match best {
                Some((_, b)) if b >= avg => best,
                _ => Some((cell, avg)),
            })?;

        Some(HandoverDecision {
            serving_cell: serving.cell_id,
            serving_rsrp,
            best_cell,
            best_rsrp,
        })
    }

    fn in_hold_off(&self, ue: NodeId, now: SimTime) -> bool {
        let hold_off = Duration::from_secs_f64(self.config.hold_off_s);
        self.last_handover
            .get(&ue)
            .is_some_and(|last| now.duration_since(*last) < hold_off)
    }
}

impl LogicModule for RsrpHandoverLm {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn processing_delay(&self) -> &RandomVariable {
        &self.config.processing_delay
    }

    fn reset(&mut self) {
        self.last_handover.clear();
    }

    fn run(&mut self, now: SimTime, data: &mut DataRepository) -> Vec<Command> {
        let cells = data.cell_to_base_station(now);
        let mut commands = Vec::new();

        for ue in data.node_ids(NodeType::MobileUnit) {
            let Some(decision) = self.evaluate(ue, now, data) else {
                debug!("UE {}: no serving-cell measurements in window", ue);
                continue;
            };
            if !decision.exceeds(self.config.hysteresis_margin_db) {
                continue;
            }
            if self.in_hold_off(ue, now) {
                debug!("UE {}: handover to cell {} held off", ue, decision.best_cell);
                continue;
            }
            let Some(rnti) = data.latest_ue_cell_info(ue, now).map(|s| s.rnti) else {
                continue;
            };
            let (Some(&serving_enb), Some(_)) = (
                cells.get(&decision.serving_cell),
                cells.get(&decision.best_cell),
            ) else {
                debug!(
                    "UE {}: cell {} or {} has no registered base station",
                    ue, decision.serving_cell, decision.best_cell
                );
                continue;
            };

            let command = Command::handover(serving_enb, rnti, decision.best_cell);
            info!(
                "UE {}: cell {} ({:.1} dBm) -> cell {} ({:.1} dBm)",
                ue,
                decision.serving_cell,
                decision.serving_rsrp,
                decision.best_cell,
                decision.best_rsrp
            );
            data.log_command_lm(Self::NAME, &command, now);
            self.last_handover.insert(ue, now);
            commands.push(command);
        }
        commands
    }
}
