//! Simulation world
//!
//! Owns the event queue, the RIC and every terminator, and routes each event
//! to its addressee. Nothing runs concurrently: one event is handled to
//! completion before the next one is popped.

use tracing::{debug, info, warn};

use oransim_common::{RandomStream, RicConfig, SimTime};

use crate::error::RicError;
use crate::event::{Event, RicEvent, Scheduler, TerminatorEvent, TerminatorHandle};
use crate::node_terminator::{E2NodeTerminator, RicBinding};
use crate::ric::NearRtRic;

/// Stream numbers below this are reserved for the RIC
const TERMINATOR_STREAM_BASE: u64 = 1000;

/// A RIC and its terminators on one timeline
#[derive(Debug)]
pub struct Simulation {
    scheduler: Scheduler<Event>,
    ric: NearRtRic,
    terminators: Vec<E2NodeTerminator>,
    seed: u64,
}

impl Simulation {
    /// Creates a simulation with an inactive RIC
    pub fn new(config: RicConfig, seed: u64) -> Result<Self, RicError> {
        Ok(Self {
            scheduler: Scheduler::new(),
            ric: NearRtRic::new(config, seed)?,
            terminators: Vec::new(),
            seed,
        })
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Seed of every random stream in the run
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The RIC
    pub fn ric(&self) -> &NearRtRic {
        &self.ric
    }

    /// The RIC, for adding logic modules before [`Simulation::start`]
    pub fn ric_mut(&mut self) -> &mut NearRtRic {
        &mut self.ric
    }

    /// Binds a terminator to the RIC. It stays inactive until started.
    pub fn add_terminator(&mut self, mut terminator: E2NodeTerminator) -> TerminatorHandle {
        let handle = TerminatorHandle(self.terminators.len());
        terminator.bind(
            RicBinding {
                handle,
                inactivity_threshold: self.ric.config().e2_node_inactivity_threshold(),
            },
            RandomStream::new(self.seed, TERMINATOR_STREAM_BASE + handle.0 as u64),
        );
        debug!("Terminator '{}' bound as {}", terminator.name(), handle);
        self.terminators.push(terminator);
        handle
    }

    /// Terminator behind a handle
    pub fn terminator(&self, handle: TerminatorHandle) -> Option<&E2NodeTerminator> {
        self.terminators.get(handle.0)
    }

    /// All terminators in the order added
    pub fn terminators(&self) -> &[E2NodeTerminator] {
        &self.terminators
    }

    /// Activates the RIC, then every terminator in the order added
    pub fn start(&mut self) {
        info!(
            "Starting simulation: {} terminators, seed {}",
            self.terminators.len(),
            self.seed
        );
        self.ric.activate(&mut self.scheduler);
        for terminator in &mut self.terminators {
            terminator.activate(&mut self.scheduler);
        }
    }

    /// Activates one terminator
    pub fn activate_terminator(&mut self, handle: TerminatorHandle) -> Result<(), RicError> {
        let terminator = self
            .terminators
            .get_mut(handle.0)
            .ok_or(RicError::UnknownTerminator(handle.0))?;
        terminator.activate(&mut self.scheduler);
        Ok(())
    }

    /// Deactivates one terminator
    pub fn deactivate_terminator(&mut self, handle: TerminatorHandle) -> Result<(), RicError> {
        let terminator = self
            .terminators
            .get_mut(handle.0)
            .ok_or(RicError::UnknownTerminator(handle.0))?;
        terminator.deactivate(&mut self.scheduler);
        Ok(())
    }

    /// Handles the next event. Returns false when the queue is empty.
    pub fn step(&mut self) -> bool {
        match self.scheduler.pop_next() {
            Some((_, event)) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Handles every event up to and including `until`, then moves the clock
    /// to `until`. Returns the number of events handled.
    pub fn run_until(&mut self, until: SimTime) -> u64 {
        let mut handled = 0;
        while let Some((_, event)) = self.scheduler.pop_until(until) {
            self.dispatch(event);
            handled += 1;
        }
        self.scheduler.advance_to(until);
        handled
    }

    /// Deactivates every terminator, then the RIC
    pub fn stop(&mut self) {
        for terminator in &mut self.terminators {
            terminator.deactivate(&mut self.scheduler);
        }
        self.ric.deactivate(&mut self.scheduler);
        info!(
            "Simulation stopped at {} after {} events ({} still in flight)",
            self.now(),
            self.scheduler.fired_count(),
            self.scheduler.pending_count()
        );
    }

    fn dispatch(&mut self, event: Event) {
        let now = self.scheduler.now();
        match event {
            Event::Terminator(handle, event) => {
                let Some(terminator) = self.terminators.get_mut(handle.0) else {
                    warn!("Event for unknown terminator {}", handle);
                    return;
                };
                match event {
                    TerminatorEvent::RegistrationTimer => terminator.register(&mut self.scheduler),
                    TerminatorEvent::SendTimer => terminator.flush_reports(&mut self.scheduler),
                    TerminatorEvent::RegistrationResponse(node_id) => {
                        terminator.receive_registration_response(node_id, &mut self.scheduler)
                    }
                    TerminatorEvent::Command(command) => {
                        if let Err(e) = terminator.receive_command(&command, now) {
                            debug!("[{}] Command not applied: {}", terminator.name(), e);
                        }
                    }
                }
            }
            Event::Ric(event) => match event {
                RicEvent::RegistrationRequest {
                    node_type,
                    requested_id,
                    handle,
                } => {
                    self.ric.receive_registration_request(
                        node_type,
                        requested_id,
                        handle,
                        &mut self.scheduler,
                    );
                }
                RicEvent::DeregistrationRequest(node_id) => {
                    self.ric.receive_deregistration_request(node_id, now)
                }
                RicEvent::Report(report) => self.ric.receive_report(&report, now),
                RicEvent::LmQuery => self.ric.on_lm_query(&mut self.scheduler),
                RicEvent::LmResponse {
                    query_id,
                    lm_index,
                    commands,
                } => self
                    .ric
                    .on_lm_response(query_id, lm_index, commands, &mut self.scheduler),
                RicEvent::LmQueryTimeout { query_id } => {
                    self.ric.on_lm_query_timeout(query_id, &mut self.scheduler)
                }
                RicEvent::InactivitySweep => self.ric.on_inactivity_sweep(&mut self.scheduler),
            },
        }
    }
}
