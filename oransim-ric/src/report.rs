//! Telemetry reports
//!
//! A report is an immutable, timestamped sample produced by one terminator's
//! reporter and persisted exactly once by the data repository.

use std::fmt;

use serde::{Deserialize, Serialize};

use oransim_common::{CellId, NodeId, Position, Rnti, SimTime};

/// One RSRP/RSRQ measurement of a cell as seen by a UE
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsrpRsrq {
    /// RNTI of the UE in its serving cell
    pub rnti: Rnti,
    /// Measured cell
    pub cell_id: CellId,
    /// Reference Signal Received Power (dBm)
    pub rsrp: f64,
    /// Reference Signal Received Quality (dB)
    pub rsrq: f64,
    /// Whether the measured cell is the serving cell
    pub is_serving_cell: bool,
    /// Component carrier of the measurement
    pub carrier_id: u16,
}

/// Report payload variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportPayload {
    /// Position of the element
    Location {
        /// Current position
        position: Position,
    },
    /// Serving cell of a UE
    CellInfo {
        /// Serving cell
        cell_id: CellId,
        /// RNTI inside the serving cell
        rnti: Rnti,
    },
    /// Cell served by a base station
    EnbCellInfo {
        /// The base station's cell
        cell_id: CellId,
    },
    /// Per-cell signal measurement
    RsrpRsrq(RsrpRsrq),
    /// Cumulative application byte counters
    AppLoss {
        /// Bytes sent
        tx_bytes: u64,
        /// Bytes received
        rx_bytes: u64,
    },
    /// Energy left in the element's energy source
    EnergyRemaining {
        /// Remaining energy (J)
        joules: f64,
    },
}

impl ReportPayload {
    /// Short name of the payload kind
    pub fn kind(&self) -> &'static str {
        match self {
            ReportPayload::Location { .. } => "Location",
            ReportPayload::CellInfo { .. } => "CellInfo",
            ReportPayload::EnbCellInfo { .. } => "EnbCellInfo",
            ReportPayload::RsrpRsrq(_) => "RsrpRsrq",
            ReportPayload::AppLoss { .. } => "AppLoss",
            ReportPayload::EnergyRemaining { .. } => "EnergyRemaining",
        }
    }
}

/// An immutable telemetry sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    reporter: NodeId,
    time: SimTime,
    payload: ReportPayload,
}

impl Report {
    /// Creates a report from `reporter` taken at `time`
    pub fn new(reporter: NodeId, time: SimTime, payload: ReportPayload) -> Self {
        Self {
            reporter,
            time,
            payload,
        }
    }

    /// Node that produced the report
    pub fn reporter(&self) -> NodeId {
        self.reporter
    }

    /// Time the sample was taken
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// The sample
    pub fn payload(&self) -> &ReportPayload {
        &self.payload
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} report from node {} at {}", self.payload.kind(), self.reporter, self.time)?;
        match &self.payload {
            ReportPayload::Location { position } => write!(f, ": position={position}"),
            ReportPayload::CellInfo { cell_id, rnti } => {
                write!(f, ": cell={cell_id} rnti={rnti}")
            }
            ReportPayload::EnbCellInfo { cell_id } => write!(f, ": cell={cell_id}"),
            ReportPayload::RsrpRsrq(m) => write!(
                f,
                ": cell={} rsrp={:.1}dBm rsrq={:.1}dB serving={}",
                m.cell_id, m.rsrp, m.rsrq, m.is_serving_cell
            ),
            ReportPayload::AppLoss { tx_bytes, rx_bytes } => {
                write!(f, ": tx={tx_bytes}B rx={rx_bytes}B")
            }
            ReportPayload::EnergyRemaining { joules } => write!(f, ": remaining={joules:.3}J"),
        }
    }
}
