//! RIC-side E2 terminator
//!
//! Grants node ids, tracks when each node last re-registered, forwards
//! reports into the data repository and dispatches commands to the
//! terminator behind each node id.
//!
//! Node ids come from a monotonic counter starting at 1 and are never reused.
//! A node that misses its keep-alive past the inactivity threshold loses its
//! id; when it registers again it gets a fresh one. Until the sweep removes
//! it, a stale id is already refused for reports and commands.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use oransim_common::logging::{log_e2_message, Direction};
use oransim_common::{NodeId, NodeType, RandomStream, RandomVariable, SimTime};

use crate::command::Command;
use crate::event::{Event, Scheduler, TerminatorEvent, TerminatorHandle};
use crate::report::Report;
use crate::repository::DataRepository;

/// A node known to the RIC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E2NodeEntry {
    /// Terminator behind the node id
    pub handle: TerminatorHandle,
    /// Declared node type
    pub node_type: NodeType,
    /// Last registration or keep-alive
    pub last_registration: SimTime,
}

/// Counters kept by the RIC-side terminator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct E2Stats {
    /// Node ids granted
    pub ids_granted: u64,
    /// Keep-alive refreshes
    pub refreshes: u64,
    /// Deregistration notices honored
    pub deregistrations: u64,
    /// Nodes removed by the inactivity sweep
    pub expired: u64,
    /// Reports stored
    pub reports_stored: u64,
    /// Reports dropped
    pub reports_dropped: u64,
    /// Commands dispatched
    pub commands_dispatched: u64,
    /// Commands dropped for stale targets
    pub commands_dropped: u64,
}

/// RIC end of the E2 interface
#[derive(Debug)]
pub struct RicE2Terminator {
    transmission_delay: RandomVariable,
    inactivity_threshold: Duration,
    rng: RandomStream,
    nodes: BTreeMap<NodeId, E2NodeEntry>,
    next_node_id: u64,
    stats: E2Stats,
}

impl RicE2Terminator {
    /// Creates a terminator with no known nodes
    pub fn new(
        transmission_delay: RandomVariable,
        inactivity_threshold: Duration,
        rng: RandomStream,
    ) -> Self {
        Self {
            transmission_delay,
            inactivity_threshold,
            rng,
            nodes: BTreeMap::new(),
            next_node_id: 1,
            stats: E2Stats::default(),
        }
    }

    /// Known node
    pub fn node(&self, node_id: NodeId) -> Option<&E2NodeEntry> {
        self.nodes.get(&node_id)
    }

    /// Returns true if `node_id` is known and re-registered within the
    /// inactivity threshold of `now`
    pub fn is_node_active(&self, node_id: NodeId, now: SimTime) -> bool {
        self.nodes
            .get(&node_id)
            .is_some_and(|e| self.is_fresh(e, now))
    }

    /// Counters
    pub fn stats(&self) -> E2Stats {
        self.stats
    }

    /// Handles a registration or keep-alive and answers with the granted id.
    ///
    /// # Panics
    ///
    /// Panics if a live node id is re-registered with a different node type
    /// by the same terminator. That is a broken terminator, not a runtime
    /// condition.
    pub fn receive_registration_request(
        &mut self,
        node_type: NodeType,
        requested_id: NodeId,
        handle: TerminatorHandle,
        data: &mut DataRepository,
        sched: &mut Scheduler<Event>,
    ) -> NodeId {
        let now = sched.now();
        log_e2_message(Direction::Uplink, "RegistrationRequest", requested_id, now);

        let live = self
            .nodes
            .get(&requested_id)
            .filter(|e| e.handle == handle && self.is_fresh(e, now))
            .copied();

        let node_id = match live {
            Some(entry) => {
                assert_eq!(
                    entry.node_type, node_type,
                    "node {requested_id} re-registered as {node_type} but was registered as {}",
                    entry.node_type
                );
                if let Some(e) = self.nodes.get_mut(&requested_id) {
                    e.last_registration = now;
                }
                self.stats.refreshes += 1;
                debug!("Keep-alive from node {} at {}", requested_id, now);
                requested_id
            }
            None => {
                if requested_id.is_registered() {
                    // Stale or foreign id: forget it before granting a new one
                    if let Some(old) = self.nodes.get(&requested_id) {
                        if old.handle == handle {
                            self.forget(requested_id, data);
                        }
                    }
                }
                let node_id = NodeId::new(self.next_node_id);
                self.next_node_id += 1;
                self.nodes.insert(
                    node_id,
                    E2NodeEntry {
                        handle,
                        node_type,
                        last_registration: now,
                    },
                );
                self.stats.ids_granted += 1;
                info!("Granted node id {} to {} terminator {}", node_id, node_type, handle);
                node_id
            }
        };

        if let Err(e) = data.register_node(node_id, node_type, now) {
            warn!("Registration of node {} not recorded: {}", node_id, e);
        }

        let delay = self.rng.draw(&self.transmission_delay);
        sched.schedule_in(
            delay,
            Event::Terminator(handle, TerminatorEvent::RegistrationResponse(node_id)),
        );
        node_id
    }

    /// Handles a deregistration notice
    pub fn receive_deregistration_request(
        &mut self,
        node_id: NodeId,
        now: SimTime,
        data: &mut DataRepository,
    ) {
        log_e2_message(Direction::Uplink, "DeregistrationRequest", node_id, now);
        if self.nodes.contains_key(&node_id) {
            self.forget(node_id, data);
            self.stats.deregistrations += 1;
            info!("Node {} deregistered at {}", node_id, now);
        } else {
            debug!("Deregistration for unknown node {}, ignoring", node_id);
        }
    }

    /// Stores a report if its node is known and fresh; otherwise drops it
    pub fn receive_report(&mut self, report: &Report, now: SimTime, data: &mut DataRepository) {
        let node_id = report.reporter();
        if !self.is_node_active(node_id, now) {
            self.stats.reports_dropped += 1;
            if self.nodes.contains_key(&node_id) {
                info!("Dropping {} from stale node {}", report.payload().kind(), node_id);
            } else {
                info!("Dropping {} from unknown node {}", report.payload().kind(), node_id);
            }
            return;
        }
        match data.save_report(report) {
            Ok(()) => self.stats.reports_stored += 1,
            Err(e) => {
                self.stats.reports_dropped += 1;
                debug!("Report from node {} not stored: {}", node_id, e);
            }
        }
    }

    /// Removes every node whose last keep-alive is older than the threshold
    pub fn sweep_inactive(&mut self, now: SimTime, data: &mut DataRepository) -> Vec<NodeId> {
        let expired: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, e)| !self.is_fresh(e, now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            info!("Node {} missed its keep-alive, removing", id);
            self.forget(*id, data);
            self.stats.expired += 1;
        }
        expired
    }

    /// Sends each command to the terminator behind its target id.
    ///
    /// Commands for unknown or stale ids are logged and dropped.
    pub fn dispatch_commands(
        &mut self,
        commands: Vec<Command>,
        data: &mut DataRepository,
        sched: &mut Scheduler<Event>,
    ) {
        let now = sched.now();
        for command in commands {
            let handle = match self.nodes.get(&command.target()) {
                Some(entry) if self.is_fresh(entry, now) => entry.handle,
                _ => {
                    self.stats.commands_dropped += 1;
                    info!("Dropping {}: target node no longer registered", command);
                    continue;
                }
            };
            data.log_command_e2(&command, now);
            log_e2_message(Direction::Downlink, command.action().kind(), command.target(), now);
            let delay = self.rng.draw(&self.transmission_delay);
            sched.schedule_in(delay, Event::Terminator(handle, TerminatorEvent::Command(command)));
            self.stats.commands_dispatched += 1;
        }
    }

    fn is_fresh(&self, entry: &E2NodeEntry, now: SimTime) -> bool {
        now.duration_since(entry.last_registration) <= self.inactivity_threshold
    }

    fn forget(&mut self, node_id: NodeId, data: &mut DataRepository) {
        self.nodes.remove(&node_id);
        if let Err(e) = data.deregister_node(node_id) {
            debug!("Deregistration of node {} not recorded: {}", node_id, e);
        }
    }
}
