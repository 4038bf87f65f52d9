//! Network element interface
//!
//! The RIC does not model radios, mobility or traffic. A terminator reads
//! telemetry from and applies commands to whatever sits behind this trait.
//! A simulator, a test double or a real device adapter all fit.

use oransim_common::{CellId, Position, Rnti, SimTime};

/// Serving cell of a UE device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServingCell {
    /// Serving cell id
    pub cell_id: CellId,
    /// RNTI inside that cell
    pub rnti: Rnti,
}

/// One cell measured by a UE
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMeasurement {
    /// Measured cell
    pub cell_id: CellId,
    /// RSRP (dBm)
    pub rsrp: f64,
    /// RSRQ (dB)
    pub rsrq: f64,
    /// Whether the measured cell is the serving cell
    pub is_serving_cell: bool,
    /// Component carrier
    pub carrier_id: u16,
}

/// Cumulative application byte counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppCounters {
    /// Bytes sent by the application
    pub tx_bytes: u64,
    /// Bytes received by the application
    pub rx_bytes: u64,
}

/// PHY-layer transmit power control of one device
pub trait TxPowerControl {
    /// Current transmit power (dBm)
    fn tx_power_dbm(&self) -> f64;
    /// Sets the transmit power (dBm)
    fn set_tx_power_dbm(&mut self, dbm: f64);
}

/// RRC-layer handover control of one base-station device
pub trait HandoverControl {
    /// Starts a handover of `rnti` towards `target_cell`.
    ///
    /// Returns false if the RRC does not know the UE.
    fn request_handover(&mut self, rnti: Rnti, target_cell: CellId) -> bool;
}

/// A network element as seen by its terminator
pub trait NetworkElement {
    /// Number of network devices on the element
    fn device_count(&self) -> u32;

    /// Brings the element's state up to `now` before telemetry is read
    fn sync(&mut self, _now: SimTime) {}

    /// Current position
    fn position(&self) -> Option<Position> {
        None
    }

    /// Serving cell of a UE device
    fn serving_cell(&self, _device: u32) -> Option<ServingCell> {
        None
    }

    /// Cell served by a base-station device
    fn cell_id(&self, _device: u32) -> Option<CellId> {
        None
    }

    /// Latest per-cell measurements of a UE device
    fn cell_measurements(&self, _device: u32) -> Vec<CellMeasurement> {
        Vec::new()
    }

    /// Cumulative application counters
    fn app_counters(&self) -> Option<AppCounters> {
        None
    }

    /// Energy remaining in the element's source (J)
    fn remaining_energy_j(&self) -> Option<f64> {
        None
    }

    /// PHY controller of a device
    fn tx_power_control(&mut self, _device: u32) -> Option<&mut dyn TxPowerControl> {
        None
    }

    /// RRC controller of a base-station device
    fn handover_control(&mut self, _device: u32) -> Option<&mut dyn HandoverControl> {
        None
    }
}
