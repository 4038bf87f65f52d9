//! Discrete-event scheduler
//!
//! The whole RIC runs on one logical timeline. Every wait (registration retry,
//! report flush, logic-module query, transmission delay) is a future event in
//! this queue rather than a blocking call.
//!
//! # Ordering
//!
//! Events fire in non-decreasing time order. Events scheduled for the same
//! instant fire in the order they were scheduled, so a run is reproducible
//! for a fixed seed.
//!
//! # Cancellation
//!
//! [`Scheduler::schedule_at`] returns an [`EventId`]. The component that
//! scheduled the event owns that handle; cancelling invalidates it and the
//! event is skipped when its time comes.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use oransim_common::sim_time::SimulationClock;
use oransim_common::{NodeId, NodeType, SimTime};

use crate::command::Command;
use crate::report::Report;

/// Handle of a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

/// Index of a terminator inside a [`crate::simulation::Simulation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminatorHandle(pub(crate) usize);

impl TerminatorHandle {
    /// Returns the raw index
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TerminatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Events addressed to a network-element terminator
#[derive(Debug, Clone)]
pub enum TerminatorEvent {
    /// Periodic registration (retry while registering, keep-alive while active)
    RegistrationTimer,
    /// Periodic report flush
    SendTimer,
    /// Registration response from the RIC carrying the granted id
    RegistrationResponse(NodeId),
    /// Command delivered by the RIC
    Command(Command),
}

/// Events addressed to the RIC
#[derive(Debug, Clone)]
pub enum RicEvent {
    /// Registration (or keep-alive re-registration) request from a terminator
    RegistrationRequest {
        /// Type reported by the terminator
        node_type: NodeType,
        /// Id the terminator currently holds (0 when unregistered)
        requested_id: NodeId,
        /// Terminator to answer
        handle: TerminatorHandle,
    },
    /// Deregistration notice
    DeregistrationRequest(NodeId),
    /// Telemetry report
    Report(Report),
    /// Periodic logic-module query
    LmQuery,
    /// A logic module finished processing a query
    LmResponse {
        /// Query the response belongs to
        query_id: u64,
        /// Index of the module in the RIC's module list
        lm_index: usize,
        /// Proposed commands
        commands: Vec<Command>,
    },
    /// Maximum wait time of a query elapsed
    LmQueryTimeout {
        /// Query that timed out
        query_id: u64,
    },
    /// Periodic inactivity sweep
    InactivitySweep,
}

/// Any event on the timeline
#[derive(Debug, Clone)]
pub enum Event {
    /// Event for one terminator
    Terminator(TerminatorHandle, TerminatorEvent),
    /// Event for the RIC
    Ric(RicEvent),
}

/// Priority queue of future events with cancellable handles
#[derive(Debug)]
pub struct Scheduler<E> {
    clock: SimulationClock,
    queue: BinaryHeap<Reverse<(SimTime, u64)>>,
    pending: HashMap<u64, E>,
    next_seq: u64,
    fired: u64,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    /// Creates an empty scheduler at time zero
    pub fn new() -> Self {
        Self {
            clock: SimulationClock::new(),
            queue: BinaryHeap::new(),
            pending: HashMap::new(),
            next_seq: 0,
            fired: 0,
        }
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Schedules `event` at absolute time `at` (times in the past fire now)
    pub fn schedule_at(&mut self, at: SimTime, event: E) -> EventId {
        let at = at.max(self.clock.now());
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse((at, seq)));
        self.pending.insert(seq, event);
        EventId(seq)
    }

    /// Schedules `event` after `delay`
    pub fn schedule_in(&mut self, delay: Duration, event: E) -> EventId {
        let at = self.clock.now() + delay;
        self.schedule_at(at, event)
    }

    /// Cancels a pending event. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.pending.remove(&id.0).is_some()
    }

    /// Cancels the event held in `slot` (if any) and clears the slot
    pub fn cancel_slot(&mut self, slot: &mut Option<EventId>) {
        if let Some(id) = slot.take() {
            self.cancel(id);
        }
    }

    /// Number of events waiting to fire
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of events fired so far
    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    /// Time of the next live event
    pub fn peek_time(&mut self) -> Option<SimTime> {
        self.discard_cancelled();
        self.queue.peek().map(|Reverse((t, _))| *t)
    }

    /// Pops the next live event and advances the clock to its time
    pub fn pop_next(&mut self) -> Option<(SimTime, E)> {
        while let Some(Reverse((at, seq))) = self.queue.pop() {
            if let Some(event) = self.pending.remove(&seq) {
                self.clock.advance_to(at);
                self.fired += 1;
                return Some((at, event));
            }
        }
        None
    }

    /// Pops the next live event only if it fires at or before `limit`
    pub fn pop_until(&mut self, limit: SimTime) -> Option<(SimTime, E)> {
        match self.peek_time() {
            Some(t) if t <= limit => self.pop_next(),
            _ => None,
        }
    }

    /// Moves the clock forward without firing anything
    pub fn advance_to(&mut self, t: SimTime) {
        self.clock.advance_to(t);
    }

    fn discard_cancelled(&mut self) {
        while let Some(Reverse((_, seq))) = self.queue.peek() {
            if self.pending.contains_key(seq) {
                break;
            }
            self.queue.pop();
        }
    }
}
