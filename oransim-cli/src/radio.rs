//! Synthetic radio environment
//!
//! A deliberately small stand-in for a full RAN simulator: UEs move on
//! straight lines, RSRP follows a log-distance path loss from each cell's
//! transmit power, traffic delivery degrades with serving RSRP and base
//! stations drain a finite energy budget at a rate set by their transmit
//! power. It gives the RIC realistic-looking telemetry to act on.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use oransim_common::{CellId, Position, Rnti, SimTime};
use oransim_ric::{
    AppCounters, CellMeasurement, HandoverControl, NetworkElement, ServingCell, TxPowerControl,
};

/// Propagation and traffic model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Path loss at 1 m (dB)
    pub reference_loss_db: f64,
    /// Path loss exponent
    pub path_loss_exponent: f64,
    /// Thermal noise floor (dBm)
    pub noise_floor_dbm: f64,
    /// RSRP at which delivery drops to zero (dBm)
    pub min_rsrp_dbm: f64,
    /// RSRP at and above which delivery is lossless (dBm)
    pub max_rsrp_dbm: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            reference_loss_db: 40.0,
            path_loss_exponent: 3.0,
            noise_floor_dbm: -110.0,
            min_rsrp_dbm: -120.0,
            max_rsrp_dbm: -80.0,
        }
    }
}

/// State of one cell
#[derive(Debug, Clone)]
pub struct CellState {
    /// Cell id
    pub cell_id: CellId,
    /// Antenna position
    pub position: Position,
    /// Current transmit power (dBm)
    pub tx_power_dbm: f64,
    /// Energy left (J)
    pub energy_j: f64,
    /// Power drawn regardless of transmit power (W)
    pub idle_power_w: f64,
    /// Wall-plug watts per radiated watt
    pub power_amplifier_factor: f64,
}

impl CellState {
    fn consumption_w(&self) -> f64 {
        let radiated_w = 10f64.powf((self.tx_power_dbm - 30.0) / 10.0);
        self.idle_power_w + radiated_w * self.power_amplifier_factor
    }
}

/// State of one UE
#[derive(Debug, Clone)]
pub struct UeState {
    /// Position at time zero
    pub start: Position,
    /// Velocity (m/s) along x and y
    pub velocity: (f64, f64),
    /// Offered application rate (bit/s)
    pub rate_bps: f64,
    /// Index of the serving cell
    pub serving: usize,
    /// RNTI in the serving cell
    pub rnti: Rnti,
    /// Bytes offered
    pub tx_bytes: f64,
    /// Bytes delivered
    pub rx_bytes: f64,
    /// Handovers completed
    pub handovers: u32,
}

/// Shared radio world
#[derive(Debug)]
pub struct RadioWorld {
    config: RadioConfig,
    cells: Vec<CellState>,
    ues: Vec<UeState>,
    now: SimTime,
    next_rnti: Rnti,
}

/// Handle to the shared world
pub type SharedWorld = Rc<RefCell<RadioWorld>>;

impl RadioWorld {
    /// Creates an empty world
    pub fn new(config: RadioConfig) -> Self {
        Self {
            config,
            cells: Vec::new(),
            ues: Vec::new(),
            now: SimTime::ZERO,
            next_rnti: 1,
        }
    }

    /// Adds a cell and returns its index
    pub fn add_cell(&mut self, cell: CellState) -> usize {
        self.cells.push(cell);
        self.cells.len() - 1
    }

    /// Adds a UE attached to the strongest cell and returns its index
    pub fn add_ue(&mut self, start: Position, velocity: (f64, f64), rate_bps: f64) -> usize {
        let serving = self.strongest_cell(&start).unwrap_or(0);
        let rnti = self.allocate_rnti();
        self.ues.push(UeState {
            start,
            velocity,
            rate_bps,
            serving,
            rnti,
            tx_bytes: 0.0,
            rx_bytes: 0.0,
            handovers: 0,
        });
        self.ues.len() - 1
    }

    /// Cells
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// UEs
    pub fn ues(&self) -> &[UeState] {
        &self.ues
    }

    /// Moves every UE, counts traffic and drains energy up to `now`
    pub fn advance(&mut self, now: SimTime) {
        if now <= self.now {
            return;
        }
        let dt = now.duration_since(self.now).as_secs_f64();
        for i in 0..self.ues.len() {
            let position = self.ue_position(i);
            let serving = self.ues[i].serving;
            let ratio = self
                .cells
                .get(serving)
                .map_or(0.0, |cell| self.delivery_ratio(self.rsrp(cell, &position)));
            let ue = &mut self.ues[i];
            let offered = ue.rate_bps * dt / 8.0;
            ue.tx_bytes += offered;
            ue.rx_bytes += offered * ratio;
        }
        for cell in &mut self.cells {
            cell.energy_j = (cell.energy_j - cell.consumption_w() * dt).max(0.0);
        }
        self.now = now;
    }

    /// Position of UE `i` at the world's current time
    pub fn ue_position(&self, i: usize) -> Position {
        let ue = &self.ues[i];
        let t = self.now.as_secs_f64();
        Position::new(
            ue.start.x + ue.velocity.0 * t,
            ue.start.y + ue.velocity.1 * t,
            ue.start.z,
        )
    }

    /// RSRP of `cell` at `position` (dBm)
    pub fn rsrp(&self, cell: &CellState, position: &Position) -> f64 {
        let d = cell.position.distance_to(position).max(1.0);
        cell.tx_power_dbm
            - self.config.reference_loss_db
            - 10.0 * self.config.path_loss_exponent * d.log10()
    }

    fn delivery_ratio(&self, rsrp: f64) -> f64 {
        let span = self.config.max_rsrp_dbm - self.config.min_rsrp_dbm;
        if span <= 0.0 {
            return if rsrp >= self.config.max_rsrp_dbm { 1.0 } else { 0.0 };
        }
        ((rsrp - self.config.min_rsrp_dbm) / span).clamp(0.0, 1.0)
    }

    fn strongest_cell(&self, position: &Position) -> Option<usize> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (i, self.rsrp(c, position)))
            .fold(None, |best: Option<(usize, f64)>, (i, r)| match best {
                Some((_, b)) if b >= r => best,
                _ => Some((i, r)),
            })
            .map(|(i, _)| i)
    }

    fn allocate_rnti(&mut self) -> Rnti {
        let rnti = self.next_rnti;
        self.next_rnti = self.next_rnti.checked_add(1).unwrap_or(1);
        rnti
    }

    fn handover(&mut self, source: usize, rnti: Rnti, target_cell: CellId) -> bool {
        let Some(target) = self.cells.iter().position(|c| c.cell_id == target_cell) else {
            return false;
        };
        let Some(ue) = self.ues.iter().position(|u| u.serving == source && u.rnti == rnti) else {
            return false;
        };
        let rnti = self.allocate_rnti();
        let ue = &mut self.ues[ue];
        ue.serving = target;
        ue.rnti = rnti;
        ue.handovers += 1;
        true
    }
}

/// A base station in the radio world
#[derive(Debug)]
pub struct BaseStationElement {
    world: SharedWorld,
    cell: usize,
}

impl BaseStationElement {
    /// Wraps cell `cell` of `world`
    pub fn new(world: SharedWorld, cell: usize) -> Self {
        Self { world, cell }
    }
}

impl TxPowerControl for BaseStationElement {
    fn tx_power_dbm(&self) -> f64 {
        self.world.borrow().cells[self.cell].tx_power_dbm
    }

    fn set_tx_power_dbm(&mut self, dbm: f64) {
        self.world.borrow_mut().cells[self.cell].tx_power_dbm = dbm;
    }
}

impl HandoverControl for BaseStationElement {
    fn request_handover(&mut self, rnti: Rnti, target_cell: CellId) -> bool {
        self.world.borrow_mut().handover(self.cell, rnti, target_cell)
    }
}

impl NetworkElement for BaseStationElement {
    fn device_count(&self) -> u32 {
        1
    }

    fn sync(&mut self, now: SimTime) {
        self.world.borrow_mut().advance(now);
    }

    fn position(&self) -> Option<Position> {
        Some(self.world.borrow().cells[self.cell].position)
    }

    fn cell_id(&self, _device: u32) -> Option<CellId> {
        Some(self.world.borrow().cells[self.cell].cell_id)
    }

    fn remaining_energy_j(&self) -> Option<f64> {
        Some(self.world.borrow().cells[self.cell].energy_j)
    }

    fn tx_power_control(&mut self, _device: u32) -> Option<&mut dyn TxPowerControl> {
        Some(self)
    }

    fn handover_control(&mut self, _device: u32) -> Option<&mut dyn HandoverControl> {
        Some(self)
    }
}

/// A UE in the radio world
#[derive(Debug)]
pub struct UeElement {
    world: SharedWorld,
    ue: usize,
}

impl UeElement {
    /// Wraps UE `ue` of `world`
    pub fn new(world: SharedWorld, ue: usize) -> Self {
        Self { world, ue }
    }
}

impl NetworkElement for UeElement {
    fn device_count(&self) -> u32 {
        1
    }

    fn sync(&mut self, now: SimTime) {
        self.world.borrow_mut().advance(now);
    }

    fn position(&self) -> Option<Position> {
        Some(self.world.borrow().ue_position(self.ue))
    }

    fn serving_cell(&self, _device: u32) -> Option<ServingCell> {
        let world = self.world.borrow();
        let ue = &world.ues[self.ue];
        world.cells.get(ue.serving).map(|c| ServingCell {
            cell_id: c.cell_id,
            rnti: ue.rnti,
        })
    }

    fn cell_measurements(&self, _device: u32) -> Vec<CellMeasurement> {
        let world = self.world.borrow();
        let position = world.ue_position(self.ue);
        let serving = world.ues[self.ue].serving;
        let rsrps: Vec<f64> = world.cells.iter().map(|c| world.rsrp(c, &position)).collect();
        let rssi_mw: f64 = rsrps.iter().map(|r| dbm_to_mw(*r)).sum::<f64>()
            + dbm_to_mw(world.config.noise_floor_dbm);
        world
            .cells
            .iter()
            .zip(rsrps)
            .enumerate()
            .map(|(i, (cell, rsrp))| CellMeasurement {
                cell_id: cell.cell_id,
                rsrp,
                rsrq: rsrp - 10.0 * rssi_mw.log10(),
                is_serving_cell: i == serving,
                carrier_id: 0,
            })
            .collect()
    }

    fn app_counters(&self) -> Option<AppCounters> {
        let world = self.world.borrow();
        let ue = &world.ues[self.ue];
        Some(AppCounters {
            tx_bytes: ue.tx_bytes as u64,
            rx_bytes: ue.rx_bytes as u64,
        })
    }
}

fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}
