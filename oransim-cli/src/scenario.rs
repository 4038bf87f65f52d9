//! Scenario description and assembly
//!
//! A scenario file names the RIC settings, the logic modules to load and
//! the radio deployment. [`ScenarioConfig::build`] turns it into a ready
//! [`Simulation`] over a shared [`RadioWorld`].

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use oransim_common::{
    CellId, EnergySavingConfig, FlatEnergySavingConfig, NodeType, Position, RicConfig,
    RsrpHandoverConfig, TerminatorConfig,
};
use oransim_ric::{
    E2NodeTerminator, EnergySavingLm, FlatEnergySavingLm, Reporter, RsrpHandoverLm, Simulation,
};

use crate::radio::{BaseStationElement, CellState, RadioConfig, RadioWorld, SharedWorld, UeElement};

/// Logic modules to load; absent entries are not loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicModulesConfig {
    /// RSRP handover module
    pub rsrp_handover: Option<RsrpHandoverConfig>,
    /// Per-base-station energy saving module
    pub energy_saving: Option<EnergySavingConfig>,
    /// Legacy broadcast energy saving module
    pub flat_energy_saving: Option<FlatEnergySavingConfig>,
}

/// One base station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseStationSpec {
    /// Cell id served
    pub cell_id: CellId,
    /// Antenna position
    pub position: Position,
    /// Initial transmit power (dBm)
    #[serde(default = "default_tx_power")]
    pub tx_power_dbm: f64,
    /// Initial energy budget (J)
    #[serde(default = "default_energy")]
    pub energy_j: f64,
    /// Static power draw (W)
    #[serde(default = "default_idle_power")]
    pub idle_power_w: f64,
    /// Wall-plug watts per radiated watt
    #[serde(default = "default_pa_factor")]
    pub power_amplifier_factor: f64,
    /// Reporters to install instead of the defaults
    #[serde(default)]
    pub reporters: Option<Vec<Reporter>>,
}

/// One UE
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UeSpec {
    /// Position at time zero
    pub position: Position,
    /// Velocity along x and y (m/s)
    #[serde(default)]
    pub velocity: [f64; 2],
    /// Offered application rate (bit/s)
    #[serde(default = "default_rate")]
    pub rate_bps: f64,
    /// Reporters to install instead of the defaults
    #[serde(default)]
    pub reporters: Option<Vec<Reporter>>,
}

fn default_tx_power() -> f64 {
    43.0
}

fn default_energy() -> f64 {
    1.0e6
}

fn default_idle_power() -> f64 {
    100.0
}

fn default_pa_factor() -> f64 {
    4.0
}

fn default_rate() -> f64 {
    1.0e6
}

/// Complete scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Seed for every random stream
    pub seed: u64,
    /// Simulated duration (seconds)
    pub duration_s: f64,
    /// RIC settings
    pub ric: RicConfig,
    /// Settings shared by every terminator
    pub terminator: TerminatorConfig,
    /// Logic modules
    pub logic_modules: LogicModulesConfig,
    /// Propagation model
    pub radio: RadioConfig,
    /// Base stations
    pub base_stations: Vec<BaseStationSpec>,
    /// UEs
    pub ues: Vec<UeSpec>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            duration_s: 10.0,
            ric: RicConfig::default(),
            terminator: TerminatorConfig::default(),
            logic_modules: LogicModulesConfig::default(),
            radio: RadioConfig::default(),
            base_stations: Vec::new(),
            ues: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    /// Checks what the component constructors do not
    pub fn validate(&self) -> Result<()> {
        if !(self.duration_s.is_finite() && self.duration_s > 0.0) {
            bail!("duration_s must be positive, got {}", self.duration_s);
        }
        if self.base_stations.is_empty() {
            bail!("scenario has no base stations");
        }
        let mut seen: Vec<CellId> = Vec::new();
        for bs in &self.base_stations {
            if seen.contains(&bs.cell_id) {
                bail!("cell id {} used by more than one base station", bs.cell_id);
            }
            seen.push(bs.cell_id);
        }
        Ok(())
    }

    /// Builds the simulation and the radio world it observes
    pub fn build(&self) -> Result<(Simulation, SharedWorld)> {
        self.validate()?;
        let world: SharedWorld = Rc::new(RefCell::new(RadioWorld::new(self.radio.clone())));
        let mut sim =
            Simulation::new(self.ric.clone(), self.seed).context("Invalid RIC configuration")?;

        self.load_logic_modules(&mut sim)?;

        for bs in &self.base_stations {
            let index = world.borrow_mut().add_cell(CellState {
                cell_id: bs.cell_id,
                position: bs.position,
                tx_power_dbm: bs.tx_power_dbm,
                energy_j: bs.energy_j,
                idle_power_w: bs.idle_power_w,
                power_amplifier_factor: bs.power_amplifier_factor,
            });
            let mut terminator = E2NodeTerminator::new(
                format!("enb-{}", bs.cell_id),
                NodeType::BaseStation,
                0,
                self.terminator.clone(),
                Box::new(BaseStationElement::new(world.clone(), index)),
            )
            .with_context(|| format!("Invalid terminator for cell {}", bs.cell_id))?;
            if let Some(reporters) = &bs.reporters {
                terminator = terminator.with_reporters(reporters.iter().copied());
            }
            sim.add_terminator(terminator);
        }

        for (i, ue) in self.ues.iter().enumerate() {
            let index = world.borrow_mut().add_ue(
                ue.position,
                (ue.velocity[0], ue.velocity[1]),
                ue.rate_bps,
            );
            let mut terminator = E2NodeTerminator::new(
                format!("ue-{i}"),
                NodeType::MobileUnit,
                0,
                self.terminator.clone(),
                Box::new(UeElement::new(world.clone(), index)),
            )
            .with_context(|| format!("Invalid terminator for UE {i}"))?;
            if let Some(reporters) = &ue.reporters {
                terminator = terminator.with_reporters(reporters.iter().copied());
            }
            sim.add_terminator(terminator);
        }

        info!(
            "Scenario built: {} base stations, {} UEs, logic modules {:?}",
            self.base_stations.len(),
            self.ues.len(),
            sim.ric().logic_module_names()
        );
        Ok((sim, world))
    }

    fn load_logic_modules(&self, sim: &mut Simulation) -> Result<()> {
        let lms = &self.logic_modules;
        if let Some(config) = &lms.rsrp_handover {
            let lm = RsrpHandoverLm::new(config.clone())
                .context("Invalid rsrp_handover configuration")?;
            sim.ric_mut().add_logic_module(Box::new(lm));
        }
        if let Some(config) = &lms.energy_saving {
            let lm = EnergySavingLm::new(config.clone())
                .context("Invalid energy_saving configuration")?;
            sim.ric_mut().add_logic_module(Box::new(lm));
        }
        if let Some(config) = &lms.flat_energy_saving {
            let lm = FlatEnergySavingLm::new(config.clone())
                .context("Invalid flat_energy_saving configuration")?;
            sim.ric_mut().add_logic_module(Box::new(lm));
        }
        Ok(())
    }
}
