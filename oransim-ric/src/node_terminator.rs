//! E2 node terminator
//!
//! Sits on a network element and speaks the E2 protocol to the RIC:
//! registers (and keeps re-registering as keep-alive), buffers and flushes
//! reports while registered, and applies commands addressed to it.
//!
//! ```text
//!  Inactive --activate--> Registering --response(id)--> Active
//!     ^                                                   |
//!     +-------------------- deactivate -------------------+
//! ```
//!
//! The node id is 0 whenever the terminator is not Active.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use oransim_common::logging::{log_e2_message, Direction};
use oransim_common::{NodeId, NodeType, RandomStream, SimTime, TerminatorConfig};

use crate::command::{Command, CommandAction};
use crate::element::NetworkElement;
use crate::error::{CommandError, RicError};
use crate::event::{Event, EventId, RicEvent, Scheduler, TerminatorEvent, TerminatorHandle};
use crate::report::Report;
use crate::reporter::Reporter;

/// Terminator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminatorState {
    /// Not participating
    Inactive,
    /// Waiting for a registration response
    Registering,
    /// Registered and reporting
    Active,
}

impl fmt::Display for TerminatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminatorState::Inactive => write!(f, "Inactive"),
            TerminatorState::Registering => write!(f, "Registering"),
            TerminatorState::Active => write!(f, "Active"),
        }
    }
}

/// Link between a terminator and the RIC it reports to
#[derive(Debug, Clone, Copy)]
pub struct RicBinding {
    /// Address of this terminator on the timeline
    pub handle: TerminatorHandle,
    /// The RIC's inactivity threshold
    pub inactivity_threshold: Duration,
}

/// Counters kept by a terminator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminatorStats {
    /// Registration requests sent
    pub registrations_sent: u64,
    /// Reports sent to the RIC
    pub reports_sent: u64,
    /// Commands applied
    pub commands_applied: u64,
    /// Commands dropped
    pub commands_dropped: u64,
    /// Activations whose registration interval exceeded the RIC inactivity threshold
    pub config_warnings: u64,
}

/// Terminator of one network element
pub struct E2NodeTerminator {
    name: String,
    node_type: NodeType,
    device_index: u32,
    config: TerminatorConfig,
    element: Box<dyn NetworkElement>,
    reporters: Vec<Reporter>,
    state: TerminatorState,
    node_id: NodeId,
    buffer: Vec<Report>,
    registration_event: Option<EventId>,
    send_event: Option<EventId>,
    binding: Option<RicBinding>,
    rng: RandomStream,
    stats: TerminatorStats,
}

impl fmt::Debug for E2NodeTerminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("E2NodeTerminator")
            .field("name", &self.name)
            .field("node_type", &self.node_type)
            .field("state", &self.state)
            .field("node_id", &self.node_id)
            .field("reporters", &self.reporters)
            .finish_non_exhaustive()
    }
}

impl E2NodeTerminator {
    /// Creates an inactive terminator with the default reporters for `node_type`
    pub fn new(
        name: impl Into<String>,
        node_type: NodeType,
        device_index: u32,
        config: TerminatorConfig,
        element: Box<dyn NetworkElement>,
    ) -> Result<Self, RicError> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            node_type,
            device_index,
            config,
            element,
            reporters: Reporter::defaults_for(node_type),
            state: TerminatorState::Inactive,
            node_id: NodeId::UNREGISTERED,
            buffer: Vec::new(),
            registration_event: None,
            send_event: None,
            binding: None,
            rng: RandomStream::new(0, 0),
            stats: TerminatorStats::default(),
        })
    }

    /// Replaces the reporter list. Reporters that do not fit the node type are skipped.
    pub fn with_reporters(mut self, reporters: impl IntoIterator<Item = Reporter>) -> Self {
        self.reporters.clear();
        for reporter in reporters {
            self.add_reporter(reporter);
        }
        self
    }

    /// Attaches a reporter
    pub fn add_reporter(&mut self, reporter: Reporter) {
        if !reporter.supports(self.node_type) {
            warn!(
                "[{}] {} reporter not supported on {} node, skipping",
                self.name, reporter, self.node_type
            );
            return;
        }
        if !self.reporters.contains(&reporter) {
            self.reporters.push(reporter);
        }
    }

    pub(crate) fn bind(&mut self, binding: RicBinding, rng: RandomStream) {
        self.binding = Some(binding);
        self.rng = rng;
    }

    /// Terminator name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node type
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Current state
    pub fn state(&self) -> TerminatorState {
        self.state
    }

    /// Node id granted by the RIC (0 when not Active)
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Attached reporters
    pub fn reporters(&self) -> &[Reporter] {
        &self.reporters
    }

    /// Counters
    pub fn stats(&self) -> TerminatorStats {
        self.stats
    }

    /// The element behind the terminator
    pub fn element(&self) -> &dyn NetworkElement {
        self.element.as_ref()
    }

    /// Starts registering with the RIC.
    ///
    /// Without a RIC binding the terminator stays Inactive.
    pub fn activate(&mut self, sched: &mut Scheduler<Event>) {
        let Some(binding) = self.binding else {
            warn!("[{}] No RIC bound, staying inactive", self.name);
            return;
        };
        if self.state != TerminatorState::Inactive {
            return;
        }
        let threshold = binding.inactivity_threshold.as_secs_f64();
        let interval = self.config.registration_interval.mean();
        if interval > threshold {
            self.stats.config_warnings += 1;
            warn!(
                "[{}] Registration interval {:.3}s exceeds RIC inactivity threshold {:.3}s",
                self.name, interval, threshold
            );
        }
        info!("[{}] Activating {} terminator", self.name, self.node_type);
        self.state = TerminatorState::Registering;
        self.buffer.clear();
        self.register(sched);
    }

    /// Leaves the RIC: cancels timers, sends a deregistration if registered
    /// and clears the buffer. Does nothing when already Inactive.
    pub fn deactivate(&mut self, sched: &mut Scheduler<Event>) {
        if self.state == TerminatorState::Inactive {
            return;
        }
        sched.cancel_slot(&mut self.registration_event);
        sched.cancel_slot(&mut self.send_event);
        if self.node_id.is_registered() {
            let delay = self.rng.draw(&self.config.transmission_delay);
            log_e2_message(Direction::Uplink, "DeregistrationRequest", self.node_id, sched.now());
            sched.schedule_in(delay, Event::Ric(RicEvent::DeregistrationRequest(self.node_id)));
        }
        info!("[{}] Deactivated (was node {})", self.name, self.node_id);
        self.node_id = NodeId::UNREGISTERED;
        self.buffer.clear();
        self.state = TerminatorState::Inactive;
    }

    /// Sends a registration request and rearms the registration timer.
    ///
    /// While Active this is the keep-alive that holds the node id.
    pub fn register(&mut self, sched: &mut Scheduler<Event>) {
        self.registration_event = None;
        if self.state == TerminatorState::Inactive {
            return;
        }
        let Some(binding) = self.binding else {
            return;
        };
        let delay = self.rng.draw(&self.config.transmission_delay);
        log_e2_message(Direction::Uplink, "RegistrationRequest", self.node_id, sched.now());
        sched.schedule_in(
            delay,
            Event::Ric(RicEvent::RegistrationRequest {
                node_type: self.node_type,
                requested_id: self.node_id,
                handle: binding.handle,
            }),
        );
        self.stats.registrations_sent += 1;

        let interval = self.rng.draw(&self.config.registration_interval);
        self.registration_event = Some(sched.schedule_in(
            interval,
            Event::Terminator(binding.handle, TerminatorEvent::RegistrationTimer),
        ));
    }

    /// Handles the RIC's answer to a registration request
    pub fn receive_registration_response(&mut self, node_id: NodeId, sched: &mut Scheduler<Event>) {
        log_e2_message(Direction::Downlink, "RegistrationResponse", node_id, sched.now());
        if self.state == TerminatorState::Inactive {
            debug!("[{}] Registration response while inactive, ignoring", self.name);
            return;
        }
        if !node_id.is_registered() {
            warn!("[{}] Registration response without node id, ignoring", self.name);
            return;
        }
        if node_id != self.node_id {
            if self.node_id.is_registered() {
                info!("[{}] Node id changed {} -> {}", self.name, self.node_id, node_id);
            } else {
                info!("[{}] Registered as node {}", self.name, node_id);
            }
            self.node_id = node_id;
        }
        if self.state == TerminatorState::Registering {
            self.state = TerminatorState::Active;
        }
        if self.send_event.is_none() {
            self.schedule_send(sched);
        }
    }

    /// Queues an externally produced report for the next flush.
    ///
    /// Reports are dropped while not Active.
    pub fn store_report(&mut self, report: Report) {
        if self.state != TerminatorState::Active {
            debug!("[{}] Dropping report while {}", self.name, self.state);
            return;
        }
        self.buffer.push(report);
    }

    /// Collects from every reporter and sends all buffered reports
    pub fn flush_reports(&mut self, sched: &mut Scheduler<Event>) {
        self.send_event = None;
        if self.state != TerminatorState::Active {
            return;
        }
        let now = sched.now();
        self.element.sync(now);
        for reporter in &self.reporters {
            let reports =
                reporter.collect(self.element.as_ref(), self.device_index, self.node_id, now);
            self.buffer.extend(reports);
        }
        let count = self.buffer.len();
        for report in self.buffer.drain(..) {
            let delay = self.rng.draw(&self.config.transmission_delay);
            sched.schedule_in(delay, Event::Ric(RicEvent::Report(report)));
        }
        self.stats.reports_sent += count as u64;
        debug!("[{}] Flushed {} reports at {}", self.name, count, now);
        self.schedule_send(sched);
    }

    /// Applies a command from the RIC. Rejected commands are logged and dropped.
    pub fn receive_command(&mut self, command: &Command, now: SimTime) -> Result<(), CommandError> {
        log_e2_message(Direction::Downlink, command.action().kind(), self.node_id, now);
        match self.apply_command(command) {
            Ok(()) => {
                self.stats.commands_applied += 1;
                info!("[{}] Applied {} at {}", self.name, command, now);
                Ok(())
            }
            Err(e) => {
                self.stats.commands_dropped += 1;
                warn!("[{}] Dropping {}: {}", self.name, command, e);
                Err(e)
            }
        }
    }

    fn apply_command(&mut self, command: &Command) -> Result<(), CommandError> {
        if self.state != TerminatorState::Active {
            return Err(CommandError::NotActive);
        }
        command.validate()?;
        if command.target() != self.node_id {
            return Err(CommandError::WrongTarget {
                expected: self.node_id,
                actual: command.target(),
            });
        }
        let device = self.device_index;
        let count = self.element.device_count();
        if device >= count {
            return Err(CommandError::MissingDevice { index: device, count });
        }
        match (self.node_type, *command.action()) {
            (
                NodeType::BaseStation,
                CommandAction::Handover {
                    target_rnti,
                    target_cell_id,
                },
            ) => {
                let rrc = self
                    .element
                    .handover_control(device)
                    .ok_or(CommandError::MissingController {
                        controller: "RRC",
                        index: device,
                    })?;
                if !rrc.request_handover(target_rnti, target_cell_id) {
                    return Err(CommandError::Malformed(format!(
                        "RRC has no UE with RNTI {target_rnti}"
                    )));
                }
                Ok(())
            }
            (NodeType::BaseStation, CommandAction::TxPowerDelta { delta_db }) => {
                let (min, max) = (self.config.tx_power_min_dbm, self.config.tx_power_max_dbm);
                let phy = self
                    .element
                    .tx_power_control(device)
                    .ok_or(CommandError::MissingController {
                        controller: "PHY",
                        index: device,
                    })?;
                let current = phy.tx_power_dbm();
                let requested = current + delta_db;
                let applied = requested.clamp(min, max);
                if applied != requested {
                    debug!("Clamped tx power {:.2} dBm to {:.2} dBm", requested, applied);
                }
                phy.set_tx_power_dbm(applied);
                Ok(())
            }
            (NodeType::MobileUnit, action) => Err(CommandError::UnsupportedForNodeType {
                node_type: NodeType::MobileUnit,
                command: action.kind(),
            }),
        }
    }

    fn schedule_send(&mut self, sched: &mut Scheduler<Event>) {
        let Some(binding) = self.binding else {
            return;
        };
        let interval = self.rng.draw(&self.config.send_interval);
        self.send_event = Some(sched.schedule_in(
            interval,
            Event::Terminator(binding.handle, TerminatorEvent::SendTimer),
        ));
    }
}
