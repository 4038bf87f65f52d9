//! Near-RT RIC orchestrator
//!
//! Owns the data repository, the RIC-side E2 terminator, the logic modules
//! and the conflict mitigation module, and drives them from the timeline:
//!
//! 1. Every `lm_query_interval_s` a query starts. Nodes past the inactivity
//!    threshold are removed first, so no module sees a stale id. Each logic
//!    module then runs on the query timestamp, in registration order, and its
//!    response is scheduled after its drawn processing delay.
//! 2. The query closes when every response is in, or when
//!    `lm_query_max_wait_s` elapses (if set). Responses arriving exactly at
//!    the deadline are still on time.
//! 3. On close, saved late commands and the collected responses go through
//!    conflict mitigation and are dispatched.
//!
//! A response for a closed query is late: dropped under
//! [`LateCommandPolicy::Drop`], kept for the next close under
//! [`LateCommandPolicy::Save`].

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use oransim_common::{LateCommandPolicy, NodeId, NodeType, RandomStream, RicConfig, SimTime};

use crate::cmm::{self, ConflictMitigation};
use crate::command::Command;
use crate::e2_terminator::RicE2Terminator;
use crate::error::RicError;
use crate::event::{Event, EventId, RicEvent, Scheduler, TerminatorHandle};
use crate::lm::LogicModule;
use crate::report::Report;
use crate::repository::DataRepository;

/// Counters kept by the orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RicStats {
    /// Queries started
    pub queries: u64,
    /// Queries closed
    pub queries_closed: u64,
    /// Queries closed by the maximum wait time
    pub queries_timed_out: u64,
    /// Responses that arrived on time
    pub responses_on_time: u64,
    /// Responses that arrived after their query closed
    pub responses_late: u64,
    /// Late commands dropped
    pub late_commands_dropped: u64,
    /// Late commands saved for the next dispatch
    pub late_commands_saved: u64,
    /// Commands handed to the E2 terminator
    pub commands_dispatched: u64,
}

#[derive(Debug)]
struct OpenQuery {
    started: SimTime,
    awaiting: usize,
    collected: Vec<Command>,
    timeout_event: Option<EventId>,
}

/// The RIC
pub struct NearRtRic {
    config: RicConfig,
    active: bool,
    data: DataRepository,
    e2: RicE2Terminator,
    lms: Vec<Box<dyn LogicModule>>,
    cmm: Box<dyn ConflictMitigation>,
    rng: RandomStream,
    query_event: Option<EventId>,
    sweep_event: Option<EventId>,
    open_queries: BTreeMap<u64, OpenQuery>,
    saved_commands: Vec<Command>,
    next_query_id: u64,
    first_valid_query: u64,
    stats: RicStats,
}

impl std::fmt::Debug for NearRtRic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearRtRic")
            .field("active", &self.active)
            .field("logic_modules", &self.logic_module_names())
            .field("cmm", &self.cmm.name())
            .field("open_queries", &self.open_queries.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl NearRtRic {
    /// Creates an inactive RIC. `seed` fixes every random stream it owns.
    pub fn new(config: RicConfig, seed: u64) -> Result<Self, RicError> {
        config.validate()?;
        let e2 = RicE2Terminator::new(
            config.transmission_delay,
            config.e2_node_inactivity_threshold(),
            RandomStream::new(seed, 2),
        );
        let cmm = cmm::from_policy(config.conflict_mitigation);
        Ok(Self {
            config,
            active: false,
            data: DataRepository::new(),
            e2,
            lms: Vec::new(),
            cmm,
            rng: RandomStream::new(seed, 1),
            query_event: None,
            sweep_event: None,
            open_queries: BTreeMap::new(),
            saved_commands: Vec::new(),
            next_query_id: 1,
            first_valid_query: 1,
            stats: RicStats::default(),
        })
    }

    /// Adds a logic module; modules are queried in the order added
    pub fn add_logic_module(&mut self, lm: Box<dyn LogicModule>) {
        info!("Logic module '{}' added", lm.name());
        self.lms.push(lm);
    }

    /// Configuration
    pub fn config(&self) -> &RicConfig {
        &self.config
    }

    /// Returns true while running
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Data repository
    pub fn data(&self) -> &DataRepository {
        &self.data
    }

    /// RIC-side E2 terminator
    pub fn e2(&self) -> &RicE2Terminator {
        &self.e2
    }

    /// Counters
    pub fn stats(&self) -> RicStats {
        self.stats
    }

    /// Names of the logic modules in query order
    pub fn logic_module_names(&self) -> Vec<&str> {
        self.lms.iter().map(|lm| lm.name()).collect()
    }

    /// Queries still waiting for responses
    pub fn open_query_count(&self) -> usize {
        self.open_queries.len()
    }

    /// Late commands waiting for the next dispatch
    pub fn saved_commands(&self) -> &[Command] {
        &self.saved_commands
    }

    /// Starts the repository, the query timer and the inactivity sweep
    pub fn activate(&mut self, sched: &mut Scheduler<Event>) {
        if self.active {
            return;
        }
        self.active = true;
        self.data.activate();
        self.first_valid_query = self.next_query_id;
        for lm in &mut self.lms {
            lm.reset();
        }
        self.query_event =
            Some(sched.schedule_in(self.config.lm_query_interval(), Event::Ric(RicEvent::LmQuery)));
        self.schedule_sweep(sched);
        let max_wait = self
            .config
            .lm_query_max_wait()
            .map_or_else(|| "unlimited".to_string(), |w| format!("{:.3}s", w.as_secs_f64()));
        info!(
            "RIC activated: {} logic modules, query every {:.3}s, max wait {}, {} late, cmm {}",
            self.lms.len(),
            self.config.lm_query_interval_s,
            max_wait,
            self.config.late_command_policy,
            self.cmm.name()
        );
    }

    /// Stops all timers, abandons open queries and saved commands, and
    /// deactivates the repository
    pub fn deactivate(&mut self, sched: &mut Scheduler<Event>) {
        if !self.active {
            return;
        }
        sched.cancel_slot(&mut self.query_event);
        sched.cancel_slot(&mut self.sweep_event);
        for (_, mut query) in std::mem::take(&mut self.open_queries) {
            sched.cancel_slot(&mut query.timeout_event);
        }
        if !self.saved_commands.is_empty() {
            debug!("Discarding {} saved commands", self.saved_commands.len());
            self.saved_commands.clear();
        }
        self.data.deactivate();
        self.active = false;
        info!("RIC deactivated");
    }

    // ---- E2 entry points ----

    /// Registration or keep-alive from a terminator
    pub fn receive_registration_request(
        &mut self,
        node_type: NodeType,
        requested_id: NodeId,
        handle: TerminatorHandle,
        sched: &mut Scheduler<Event>,
    ) -> Option<NodeId> {
        if !self.active {
            debug!("RIC inactive, ignoring registration from {}", handle);
            return None;
        }
        let node_id = self.e2.receive_registration_request(
            node_type,
            requested_id,
            handle,
            &mut self.data,
            sched,
        );
        Some(node_id)
    }

    /// Deregistration notice
    pub fn receive_deregistration_request(&mut self, node_id: NodeId, now: SimTime) {
        if !self.active {
            return;
        }
        self.e2.receive_deregistration_request(node_id, now, &mut self.data);
    }

    /// Telemetry report arriving at `now`
    pub fn receive_report(&mut self, report: &Report, now: SimTime) {
        if !self.active {
            return;
        }
        self.e2.receive_report(report, now, &mut self.data);
    }

    // ---- timers ----

    /// Starts a query of all logic modules
    pub fn on_lm_query(&mut self, sched: &mut Scheduler<Event>) {
        self.query_event = None;
        if !self.active {
            return;
        }
        let now = sched.now();
        let query_id = self.next_query_id;
        self.next_query_id += 1;
        self.stats.queries += 1;
        let max_wait = self.config.lm_query_max_wait();

        let expired = self.e2.sweep_inactive(now, &mut self.data);
        if !expired.is_empty() {
            debug!("Query {} skips {} stale nodes", query_id, expired.len());
        }

        for (lm_index, lm) in self.lms.iter_mut().enumerate() {
            let commands = lm.run(now, &mut self.data);
            let delay = self.rng.draw(lm.processing_delay());
            let late = max_wait.is_some_and(|w| delay > w);
            if late {
                debug!(
                    "'{}' will miss query {}: {:.3}s processing",
                    lm.name(),
                    query_id,
                    delay.as_secs_f64()
                );
            }
            self.data.log_lm_query(lm.name(), now, commands.len(), delay, late);
            sched.schedule_in(
                delay,
                Event::Ric(RicEvent::LmResponse {
                    query_id,
                    lm_index,
                    commands,
                }),
            );
        }

        // After the responses so that a response at the deadline counts as on time
        let timeout_event = max_wait
            .map(|w| sched.schedule_in(w, Event::Ric(RicEvent::LmQueryTimeout { query_id })));
        self.open_queries.insert(
            query_id,
            OpenQuery {
                started: now,
                awaiting: self.lms.len(),
                collected: Vec::new(),
                timeout_event,
            },
        );
        if self.lms.is_empty() {
            self.close_query(query_id, sched);
        }

        self.query_event =
            Some(sched.schedule_in(self.config.lm_query_interval(), Event::Ric(RicEvent::LmQuery)));
    }

    /// Collects a logic-module response
    pub fn on_lm_response(
        &mut self,
        query_id: u64,
        lm_index: usize,
        commands: Vec<Command>,
        sched: &mut Scheduler<Event>,
    ) {
        if !self.active || query_id < self.first_valid_query {
            return;
        }
        let name = self.lms.get(lm_index).map_or("?", |lm| lm.name()).to_string();
        match self.open_queries.get_mut(&query_id) {
            Some(query) => {
                self.stats.responses_on_time += 1;
                query.collected.extend(commands);
                query.awaiting = query.awaiting.saturating_sub(1);
                if query.awaiting == 0 {
                    self.close_query(query_id, sched);
                }
            }
            None => {
                self.stats.responses_late += 1;
                if commands.is_empty() {
                    return;
                }
                match self.config.late_command_policy {
                    LateCommandPolicy::Drop => {
                        self.stats.late_commands_dropped += commands.len() as u64;
                        for command in &commands {
                            info!("Dropping late {} from '{}' (query {})", command, name, query_id);
                        }
                    }
                    LateCommandPolicy::Save => {
                        self.stats.late_commands_saved += commands.len() as u64;
                        info!(
                            "Saving {} late commands from '{}' (query {}) for next dispatch",
                            commands.len(),
                            name,
                            query_id
                        );
                        self.saved_commands.extend(commands);
                    }
                }
            }
        }
    }

    /// Closes a query whose maximum wait elapsed
    pub fn on_lm_query_timeout(&mut self, query_id: u64, sched: &mut Scheduler<Event>) {
        if !self.active {
            return;
        }
        if let Some(query) = self.open_queries.get_mut(&query_id) {
            query.timeout_event = None;
            warn!(
                "Query {} timed out waiting for {} logic modules",
                query_id, query.awaiting
            );
            self.stats.queries_timed_out += 1;
            self.close_query(query_id, sched);
        }
    }

    /// Removes nodes that stopped re-registering
    pub fn on_inactivity_sweep(&mut self, sched: &mut Scheduler<Event>) {
        self.sweep_event = None;
        if !self.active {
            return;
        }
        let expired = self.e2.sweep_inactive(sched.now(), &mut self.data);
        if !expired.is_empty() {
            debug!("Inactivity sweep removed {} nodes", expired.len());
        }
        self.schedule_sweep(sched);
    }

    fn close_query(&mut self, query_id: u64, sched: &mut Scheduler<Event>) {
        let Some(mut query) = self.open_queries.remove(&query_id) else {
            return;
        };
        sched.cancel_slot(&mut query.timeout_event);
        let mut batch = std::mem::take(&mut self.saved_commands);
        batch.append(&mut query.collected);
        let proposed = batch.len();
        let commands = self.cmm.filter(batch);
        debug!(
            "Query {} (started {}) closed at {}: {} proposed, {} dispatched",
            query_id,
            query.started,
            sched.now(),
            proposed,
            commands.len()
        );
        self.stats.queries_closed += 1;
        self.stats.commands_dispatched += commands.len() as u64;
        self.e2.dispatch_commands(commands, &mut self.data, sched);
    }

    fn schedule_sweep(&mut self, sched: &mut Scheduler<Event>) {
        let interval = self.rng.draw(&self.config.e2_node_inactivity_interval);
        self.sweep_event = Some(sched.schedule_in(interval, Event::Ric(RicEvent::InactivitySweep)));
    }
}
