//! Reporters
//!
//! Each reporter kind samples one aspect of a network element. A terminator
//! owns a list of them and collects from all of them on every flush while it
//! is registered.

use std::fmt;

use serde::{Deserialize, Serialize};

use oransim_common::{NodeId, NodeType, SimTime};

use crate::element::NetworkElement;
use crate::report::{Report, ReportPayload, RsrpRsrq};

/// Reporter kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reporter {
    /// Element position
    Location,
    /// Serving cell and RNTI of a UE
    UeCellInfo,
    /// Cell id of a base station
    EnbCellInfo,
    /// Per-cell RSRP/RSRQ of a UE
    RsrpRsrq,
    /// Application byte counters
    AppLoss,
    /// Remaining energy
    EnergyRemaining,
}

impl Reporter {
    /// Reporters attached to a node type when none are configured
    pub fn defaults_for(node_type: NodeType) -> Vec<Reporter> {
        match node_type {
            NodeType::BaseStation => vec![Reporter::Location, Reporter::EnbCellInfo],
            NodeType::MobileUnit => vec![
                Reporter::Location,
                Reporter::UeCellInfo,
                Reporter::RsrpRsrq,
                Reporter::AppLoss,
            ],
        }
    }

    /// Whether the reporter makes sense on a node type
    pub fn supports(&self, node_type: NodeType) -> bool {
        match self {
            Reporter::Location | Reporter::AppLoss | Reporter::EnergyRemaining => true,
            Reporter::UeCellInfo | Reporter::RsrpRsrq => node_type == NodeType::MobileUnit,
            Reporter::EnbCellInfo => node_type == NodeType::BaseStation,
        }
    }

    /// Samples the element. Missing telemetry yields no report.
    pub fn collect(
        &self,
        element: &dyn NetworkElement,
        device: u32,
        node_id: NodeId,
        now: SimTime,
    ) -> Vec<Report> {
        let report = |payload| Report::new(node_id, now, payload);
        match self {
            Reporter::Location => element
                .position()
                .map(|position| report(ReportPayload::Location { position }))
                .into_iter()
                .collect(),
            Reporter::UeCellInfo => element
                .serving_cell(device)
                .map(|s| {
                    report(ReportPayload::CellInfo {
                        cell_id: s.cell_id,
                        rnti: s.rnti,
                    })
                })
                .into_iter()
                .collect(),
            Reporter::EnbCellInfo => element
                .cell_id(device)
                .map(|cell_id| report(ReportPayload::EnbCellInfo { cell_id }))
                .into_iter()
                .collect(),
            Reporter::RsrpRsrq => {
                // RNTI is only meaningful while attached
                let Some(serving) = element.serving_cell(device) else {
                    return Vec::new();
                };
                element
                    .cell_measurements(device)
                    .into_iter()
                    .map(|m| {
                        report(ReportPayload::RsrpRsrq(RsrpRsrq {
                            rnti: serving.rnti,
                            cell_id: m.cell_id,
                            rsrp: m.rsrp,
                            rsrq: m.rsrq,
                            is_serving_cell: m.is_serving_cell,
                            carrier_id: m.carrier_id,
                        }))
                    })
                    .collect()
            }
            Reporter::AppLoss => element
                .app_counters()
                .map(|c| {
                    report(ReportPayload::AppLoss {
                        tx_bytes: c.tx_bytes,
                        rx_bytes: c.rx_bytes,
                    })
                })
                .into_iter()
                .collect(),
            Reporter::EnergyRemaining => element
                .remaining_energy_j()
                .map(|joules| report(ReportPayload::EnergyRemaining { joules }))
                .into_iter()
                .collect(),
        }
    }
}

impl fmt::Display for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reporter::Location => write!(f, "Location"),
            Reporter::UeCellInfo => write!(f, "UeCellInfo"),
            Reporter::EnbCellInfo => write!(f, "EnbCellInfo"),
            Reporter::RsrpRsrq => write!(f, "RsrpRsrq"),
            Reporter::AppLoss => write!(f, "AppLoss"),
            Reporter::EnergyRemaining => write!(f, "EnergyRemaining"),
        }
    }
}
