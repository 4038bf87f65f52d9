//! Data repository
//!
//! Time-indexed store of everything the RIC knows: the E2 node registration
//! table, per-node telemetry histories and the command audit log. Terminators
//! write into it when reports arrive and logic modules read from it during a
//! query.
//!
//! Samples are kept sorted by time. A sample that arrives out of order is
//! inserted at its time position; samples with equal times keep arrival
//! order. Range reads are inclusive on both ends.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, trace};

use oransim_common::{CellId, NodeId, NodeType, Position, SimTime};

use crate::command::Command;
use crate::element::{AppCounters, ServingCell};
use crate::error::RepositoryError;
use crate::report::{Report, ReportPayload, RsrpRsrq};

/// Samples of one kind for one node, ordered by time
#[derive(Debug, Clone)]
pub struct TimeSeries<T> {
    samples: Vec<(SimTime, T)>,
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
        }
    }
}

impl<T> TimeSeries<T> {
    /// Creates an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a sample at its time position. Returns true if it arrived out of order.
    pub fn insert(&mut self, time: SimTime, value: T) -> bool {
        let idx = self.samples.partition_point(|(t, _)| *t <= time);
        let out_of_order = idx < self.samples.len();
        self.samples.insert(idx, (time, value));
        out_of_order
    }

    /// Samples with `from <= time <= to`
    pub fn range(&self, from: SimTime, to: SimTime) -> &[(SimTime, T)] {
        if from > to {
            return &[];
        }
        let lo = self.samples.partition_point(|(t, _)| *t < from);
        let hi = self.samples.partition_point(|(t, _)| *t <= to);
        &self.samples[lo..hi]
    }

    /// Most recent sample taken at or before `at`
    pub fn latest_at(&self, at: SimTime) -> Option<&(SimTime, T)> {
        let hi = self.samples.partition_point(|(t, _)| *t <= at);
        hi.checked_sub(1).map(|i| &self.samples[i])
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if there are no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Registration record of an E2 node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    /// Node type declared at registration
    pub node_type: NodeType,
    /// Whether the node is currently registered
    pub registered: bool,
    /// First registration time
    pub first_registration: SimTime,
    /// Latest registration or keep-alive time
    pub last_registration: SimTime,
}

#[derive(Debug, Default)]
struct NodeSeries {
    location: TimeSeries<Position>,
    ue_cell: TimeSeries<ServingCell>,
    enb_cell: TimeSeries<CellId>,
    rsrp: TimeSeries<RsrpRsrq>,
    app: TimeSeries<AppCounters>,
    energy: TimeSeries<f64>,
}

/// Who issued a logged command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CommandSource {
    /// Proposed by the named logic module
    LogicModule(String),
    /// Dispatched by the RIC's E2 terminator
    E2Terminator,
}

/// One entry of the command audit log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandLogEntry {
    /// Time the command was logged
    pub time: SimTime,
    /// Issuer
    pub source: CommandSource,
    /// The command
    pub command: Command,
}

/// One logic-module invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LmQueryLogEntry {
    /// Query start time
    pub time: SimTime,
    /// Logic module name
    pub lm_name: String,
    /// Commands proposed
    pub commands: usize,
    /// Drawn processing delay (seconds)
    pub processing_delay_s: f64,
    /// Whether the response missed the maximum wait time
    pub late: bool,
}

/// Time-indexed telemetry and registration store
#[derive(Debug, Default)]
pub struct DataRepository {
    active: bool,
    nodes: BTreeMap<NodeId, NodeRecord>,
    series: HashMap<NodeId, NodeSeries>,
    command_log: Vec<CommandLogEntry>,
    query_log: Vec<LmQueryLogEntry>,
    samples_stored: u64,
    out_of_order: u64,
}

impl DataRepository {
    /// Creates an inactive, empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts accepting writes
    pub fn activate(&mut self) {
        if !self.active {
            info!("Data repository activated");
            self.active = true;
        }
    }

    /// Stops accepting writes. Stored data is kept.
    pub fn deactivate(&mut self) {
        if self.active {
            info!(
                "Data repository deactivated ({} samples, {} commands logged)",
                self.samples_stored,
                self.command_log.len()
            );
            self.active = false;
        }
    }

    /// Returns true if writes are accepted
    pub fn is_active(&self) -> bool {
        self.active
    }

    // ---- registration table ----

    /// Records a registration or keep-alive of `node_id`
    pub fn register_node(
        &mut self,
        node_id: NodeId,
        node_type: NodeType,
        time: SimTime,
    ) -> Result<(), RepositoryError> {
        self.ensure_active()?;
        if !node_id.is_registered() {
            return Err(RepositoryError::ReservedNodeId);
        }
        match self.nodes.get_mut(&node_id) {
            Some(record) => {
                if record.node_type != node_type {
                    return Err(RepositoryError::WrongNodeType {
                        node_id,
                        node_type: record.node_type,
                        kind: "Registration",
                    });
                }
                record.registered = true;
                record.last_registration = time;
                trace!("Node {} refreshed at {}", node_id, time);
            }
            None => {
                self.nodes.insert(
                    node_id,
                    NodeRecord {
                        node_type,
                        registered: true,
                        first_registration: time,
                        last_registration: time,
                    },
                );
                self.series.entry(node_id).or_default();
                debug!("Node {} registered as {} at {}", node_id, node_type, time);
            }
        }
        Ok(())
    }

    /// Marks `node_id` deregistered. Its history stays readable.
    pub fn deregister_node(&mut self, node_id: NodeId) -> Result<(), RepositoryError> {
        self.ensure_active()?;
        let record = self
            .nodes
            .get_mut(&node_id)
            .ok_or(RepositoryError::UnknownNode(node_id))?;
        record.registered = false;
        debug!("Node {} deregistered", node_id);
        Ok(())
    }

    /// Returns true if `node_id` is currently registered
    pub fn is_registered(&self, node_id: NodeId) -> bool {
        self.nodes.get(&node_id).is_some_and(|r| r.registered)
    }

    /// Registration record of a node
    pub fn node(&self, node_id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&node_id)
    }

    /// Ids of currently registered nodes of `node_type`, ascending
    pub fn node_ids(&self, node_type: NodeType) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, r)| r.registered && r.node_type == node_type)
            .map(|(id, _)| *id)
            .collect()
    }

    // ---- writes ----

    /// Stores a report in the series matching its payload
    pub fn save_report(&mut self, report: &Report) -> Result<(), RepositoryError> {
        let id = report.reporter();
        let t = report.time();
        match report.payload() {
            ReportPayload::Location { position } => self.save_location(id, *position, t),
            ReportPayload::CellInfo { cell_id, rnti } => self.save_ue_cell_info(
                id,
                ServingCell {
                    cell_id: *cell_id,
                    rnti: *rnti,
                },
                t,
            ),
            ReportPayload::EnbCellInfo { cell_id } => self.save_enb_cell_info(id, *cell_id, t),
            ReportPayload::RsrpRsrq(m) => self.save_rsrp_rsrq(id, *m, t),
            ReportPayload::AppLoss { tx_bytes, rx_bytes } => self.save_app_counters(
                id,
                AppCounters {
                    tx_bytes: *tx_bytes,
                    rx_bytes: *rx_bytes,
                },
                t,
            ),
            ReportPayload::EnergyRemaining { joules } => {
                self.save_energy_remaining(id, *joules, t)
            }
        }
    }

    /// Stores a position sample
    pub fn save_location(
        &mut self,
        node_id: NodeId,
        position: Position,
        time: SimTime,
    ) -> Result<(), RepositoryError> {
        if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
            return Err(invalid("Location", time, "non-finite coordinate"));
        }
        let series = self.writable(node_id, "Location", None)?;
        let late = series.location.insert(time, position);
        self.stored(node_id, "Location", time, late);
        Ok(())
    }

    /// Stores the serving cell of a UE
    pub fn save_ue_cell_info(
        &mut self,
        node_id: NodeId,
        cell: ServingCell,
        time: SimTime,
    ) -> Result<(), RepositoryError> {
        let series = self.writable(node_id, "CellInfo", Some(NodeType::MobileUnit))?;
        let late = series.ue_cell.insert(time, cell);
        self.stored(node_id, "CellInfo", time, late);
        Ok(())
    }

    /// Stores the cell served by a base station
    pub fn save_enb_cell_info(
        &mut self,
        node_id: NodeId,
        cell_id: CellId,
        time: SimTime,
    ) -> Result<(), RepositoryError> {
        let series = self.writable(node_id, "EnbCellInfo", Some(NodeType::BaseStation))?;
        let late = series.enb_cell.insert(time, cell_id);
        self.stored(node_id, "EnbCellInfo", time, late);
        Ok(())
    }

    /// Stores one RSRP/RSRQ measurement of a UE
    pub fn save_rsrp_rsrq(
        &mut self,
        node_id: NodeId,
        measurement: RsrpRsrq,
        time: SimTime,
    ) -> Result<(), RepositoryError> {
        if !(measurement.rsrp.is_finite() && measurement.rsrq.is_finite()) {
            return Err(invalid("RsrpRsrq", time, "non-finite measurement"));
        }
        let series = self.writable(node_id, "RsrpRsrq", Some(NodeType::MobileUnit))?;
        let late = series.rsrp.insert(time, measurement);
        self.stored(node_id, "RsrpRsrq", time, late);
        Ok(())
    }

    /// Stores cumulative application counters
    pub fn save_app_counters(
        &mut self,
        node_id: NodeId,
        counters: AppCounters,
        time: SimTime,
    ) -> Result<(), RepositoryError> {
        let series = self.writable(node_id, "AppLoss", None)?;
        let late = series.app.insert(time, counters);
        self.stored(node_id, "AppLoss", time, late);
        Ok(())
    }

    /// Stores the remaining energy of a node
    pub fn save_energy_remaining(
        &mut self,
        node_id: NodeId,
        joules: f64,
        time: SimTime,
    ) -> Result<(), RepositoryError> {
        if !joules.is_finite() {
            return Err(invalid("EnergyRemaining", time, "non-finite energy"));
        }
        let series = self.writable(node_id, "EnergyRemaining", None)?;
        let late = series.energy.insert(time, joules);
        self.stored(node_id, "EnergyRemaining", time, late);
        Ok(())
    }

    // ---- reads ----

    /// Positions of a node in `[from, to]`
    pub fn get_location(
        &self,
        node_id: NodeId,
        from: SimTime,
        to: SimTime,
    ) -> Vec<(SimTime, Position)> {
        self.read(node_id, |s| s.location.range(from, to).to_vec())
    }

    /// Serving-cell samples of a UE in `[from, to]`
    pub fn get_ue_cell_info(
        &self,
        node_id: NodeId,
        from: SimTime,
        to: SimTime,
    ) -> Vec<(SimTime, ServingCell)> {
        self.read(node_id, |s| s.ue_cell.range(from, to).to_vec())
    }

    /// Cell-id samples of a base station in `[from, to]`
    pub fn get_enb_cell_info(
        &self,
        node_id: NodeId,
        from: SimTime,
        to: SimTime,
    ) -> Vec<(SimTime, CellId)> {
        self.read(node_id, |s| s.enb_cell.range(from, to).to_vec())
    }

    /// RSRP/RSRQ samples of a UE in `[from, to]`
    pub fn get_rsrp_rsrq(
        &self,
        node_id: NodeId,
        from: SimTime,
        to: SimTime,
    ) -> Vec<(SimTime, RsrpRsrq)> {
        self.read(node_id, |s| s.rsrp.range(from, to).to_vec())
    }

    /// Application counter samples in `[from, to]`
    pub fn get_app_counters(
        &self,
        node_id: NodeId,
        from: SimTime,
        to: SimTime,
    ) -> Vec<(SimTime, AppCounters)> {
        self.read(node_id, |s| s.app.range(from, to).to_vec())
    }

    /// Remaining-energy samples in `[from, to]`
    pub fn get_energy_remaining(
        &self,
        node_id: NodeId,
        from: SimTime,
        to: SimTime,
    ) -> Vec<(SimTime, f64)> {
        self.read(node_id, |s| s.energy.range(from, to).to_vec())
    }

    /// Latest serving cell of a UE at or before `at`
    pub fn latest_ue_cell_info(&self, node_id: NodeId, at: SimTime) -> Option<ServingCell> {
        self.latest(node_id, |s| s.ue_cell.latest_at(at).map(|(_, v)| *v))
    }

    /// Latest cell id of a base station at or before `at`
    pub fn latest_enb_cell_id(&self, node_id: NodeId, at: SimTime) -> Option<CellId> {
        self.latest(node_id, |s| s.enb_cell.latest_at(at).map(|(_, v)| *v))
    }

    /// Latest application counters at or before `at`
    pub fn latest_app_counters(&self, node_id: NodeId, at: SimTime) -> Option<AppCounters> {
        self.latest(node_id, |s| s.app.latest_at(at).map(|(_, v)| *v))
    }

    /// Latest remaining energy at or before `at`
    pub fn latest_energy_remaining(&self, node_id: NodeId, at: SimTime) -> Option<f64> {
        self.latest(node_id, |s| s.energy.latest_at(at).map(|(_, v)| *v))
    }

    /// Map from cell id to the registered base station serving it at `at`.
    ///
    /// If two base stations claim the same cell, the lower node id wins.
    pub fn cell_to_base_station(&self, at: SimTime) -> BTreeMap<CellId, NodeId> {
        let mut map = BTreeMap::new();
        for enb in self.node_ids(NodeType::BaseStation) {
            if let Some(cell) = self.latest_enb_cell_id(enb, at) {
                map.entry(cell).or_insert(enb);
            }
        }
        map
    }

    // ---- audit log ----

    /// Logs a command proposed by a logic module
    pub fn log_command_lm(&mut self, lm_name: &str, command: &Command, time: SimTime) {
        if !self.active {
            return;
        }
        debug!("[{}] {} proposed {}", time, lm_name, command);
        self.command_log.push(CommandLogEntry {
            time,
            source: CommandSource::LogicModule(lm_name.to_string()),
            command: command.clone(),
        });
    }

    /// Logs a command dispatched to a node
    pub fn log_command_e2(&mut self, command: &Command, time: SimTime) {
        if !self.active {
            return;
        }
        self.command_log.push(CommandLogEntry {
            time,
            source: CommandSource::E2Terminator,
            command: command.clone(),
        });
    }

    /// Logs one logic-module invocation
    pub fn log_lm_query(
        &mut self,
        lm_name: &str,
        time: SimTime,
        commands: usize,
        processing_delay: Duration,
        late: bool,
    ) {
        if !self.active {
            return;
        }
        self.query_log.push(LmQueryLogEntry {
            time,
            lm_name: lm_name.to_string(),
            commands,
            processing_delay_s: processing_delay.as_secs_f64(),
            late,
        });
    }

    /// Command audit log in logging order
    pub fn command_log(&self) -> &[CommandLogEntry] {
        &self.command_log
    }

    /// Logic-module invocation log in logging order
    pub fn query_log(&self) -> &[LmQueryLogEntry] {
        &self.query_log
    }

    /// Number of samples stored so far
    pub fn samples_stored(&self) -> u64 {
        self.samples_stored
    }

    /// Number of samples that arrived out of time order
    pub fn out_of_order_samples(&self) -> u64 {
        self.out_of_order
    }

    fn ensure_active(&self) -> Result<(), RepositoryError> {
        if self.active {
            Ok(())
        } else {
            Err(RepositoryError::Inactive)
        }
    }

    fn writable(
        &mut self,
        node_id: NodeId,
        kind: &'static str,
        required: Option<NodeType>,
    ) -> Result<&mut NodeSeries, RepositoryError> {
        self.ensure_active()?;
        let record = self
            .nodes
            .get(&node_id)
            .ok_or(RepositoryError::UnknownNode(node_id))?;
        if !record.registered {
            return Err(RepositoryError::NotRegistered(node_id));
        }
        if let Some(required) = required {
            if record.node_type != required {
                return Err(RepositoryError::WrongNodeType {
                    node_id,
                    node_type: record.node_type,
                    kind,
                });
            }
        }
        Ok(self.series.entry(node_id).or_default())
    }

    fn stored(&mut self, node_id: NodeId, kind: &str, time: SimTime, out_of_order: bool) {
        self.samples_stored += 1;
        if out_of_order {
            self.out_of_order += 1;
            debug!("Out-of-order {} sample from node {} at {}", kind, node_id, time);
        } else {
            trace!("Stored {} sample from node {} at {}", kind, node_id, time);
        }
    }

    fn read<T>(&self, node_id: NodeId, f: impl FnOnce(&NodeSeries) -> Vec<T>) -> Vec<T> {
        if !self.active {
            return Vec::new();
        }
        self.series.get(&node_id).map(f).unwrap_or_default()
    }

    fn latest<T>(&self, node_id: NodeId, f: impl FnOnce(&NodeSeries) -> Option<T>) -> Option<T> {
        if !self.active {
            return None;
        }
        self.series.get(&node_id).and_then(f)
    }
}

fn invalid(kind: &'static str, time: SimTime, reason: &str) -> RepositoryError {
    RepositoryError::InvalidSample {
        kind,
        time,
        reason: reason.to_string(),
    }
}
