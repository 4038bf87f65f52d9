//! Test fixtures and scenario builders
//!
//! [`TestScenario`] collects configuration, base stations and UEs, then
//! builds a [`TestNetwork`]: a ready simulation plus handles to every mock.

use std::cell::RefCell;
use std::rc::Rc;

use oransim_common::{
    ConflictMitigationPolicy, LateCommandPolicy, NodeId, NodeType, RandomVariable, RicConfig,
    SimTime, TerminatorConfig,
};
use oransim_ric::{
    Command, DataRepository, E2NodeTerminator, LogicModule, Reporter, Simulation, TerminatorHandle,
};

use crate::mock_element::{BsState, MockBaseStation, MockUe, UeState};
use crate::test_utils::secs;

/// Base station under test
#[derive(Debug, Clone)]
pub struct BsHandle {
    pub handle: TerminatorHandle,
    pub state: Rc<RefCell<BsState>>,
}

/// UE under test
#[derive(Debug, Clone)]
pub struct UeHandle {
    pub handle: TerminatorHandle,
    pub state: Rc<RefCell<UeState>>,
}

/// Scenario builder
pub struct TestScenario {
    pub ric: RicConfig,
    pub terminator: TerminatorConfig,
    pub seed: u64,
    base_stations: Vec<BsState>,
    ues: Vec<UeState>,
    logic_modules: Vec<Box<dyn LogicModule>>,
}

impl Default for TestScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl TestScenario {
    /// Defaults everywhere, zero transmission delay
    pub fn new() -> Self {
        Self {
            ric: RicConfig::default(),
            terminator: TerminatorConfig::default(),
            seed: 1,
            base_stations: Vec::new(),
            ues: Vec::new(),
            logic_modules: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_query_interval(mut self, interval_s: f64) -> Self {
        self.ric.lm_query_interval_s = interval_s;
        self
    }

    pub fn with_max_wait(mut self, max_wait_s: f64, policy: LateCommandPolicy) -> Self {
        self.ric.lm_query_max_wait_s = max_wait_s;
        self.ric.late_command_policy = policy;
        self
    }

    pub fn with_conflict_mitigation(mut self, policy: ConflictMitigationPolicy) -> Self {
        self.ric.conflict_mitigation = policy;
        self
    }

    pub fn with_send_interval(mut self, interval_s: f64) -> Self {
        self.terminator.send_interval = RandomVariable::constant(interval_s);
        self
    }

    pub fn with_transmission_delay(mut self, delay: RandomVariable) -> Self {
        self.ric.transmission_delay = delay;
        self.terminator.transmission_delay = delay;
        self
    }

    pub fn base_station(mut self, state: BsState) -> Self {
        self.base_stations.push(state);
        self
    }

    pub fn ue(mut self, state: UeState) -> Self {
        self.ues.push(state);
        self
    }

    pub fn logic_module(mut self, lm: impl LogicModule + 'static) -> Self {
        self.logic_modules.push(Box::new(lm));
        self
    }

    /// Wires everything up. Nothing is started.
    pub fn build(self) -> TestNetwork {
        let mut sim = Simulation::new(self.ric, self.seed).expect("should create simulation");
        for lm in self.logic_modules {
            sim.ric_mut().add_logic_module(lm);
        }

        let base_stations = self
            .base_stations
            .into_iter()
            .map(|state| {
                let mock = MockBaseStation::new(state);
                let shared = mock.state.clone();
                let cell = shared.borrow().cell_id;
                let terminator = E2NodeTerminator::new(
                    format!("enb-{cell}"),
                    NodeType::BaseStation,
                    0,
                    self.terminator.clone(),
                    Box::new(mock),
                )
                .expect("should create base station terminator")
                .with_reporters([
                    Reporter::Location,
                    Reporter::EnbCellInfo,
                    Reporter::EnergyRemaining,
                ]);
                BsHandle {
                    handle: sim.add_terminator(terminator),
                    state: shared,
                }
            })
            .collect();

        let ues = self
            .ues
            .into_iter()
            .enumerate()
            .map(|(i, state)| {
                let mock = MockUe::new(state);
                let shared = mock.state.clone();
                let terminator = E2NodeTerminator::new(
                    format!("ue-{i}"),
                    NodeType::MobileUnit,
                    0,
                    self.terminator.clone(),
                    Box::new(mock),
                )
                .expect("should create UE terminator");
                UeHandle {
                    handle: sim.add_terminator(terminator),
                    state: shared,
                }
            })
            .collect();

        TestNetwork {
            sim,
            base_stations,
            ues,
        }
    }
}

/// A built scenario
#[derive(Debug)]
pub struct TestNetwork {
    pub sim: Simulation,
    pub base_stations: Vec<BsHandle>,
    pub ues: Vec<UeHandle>,
}

impl TestNetwork {
    /// Node id currently held by a terminator
    pub fn node_id(&self, handle: TerminatorHandle) -> NodeId {
        self.sim
            .terminator(handle)
            .map(|t| t.node_id())
            .expect("handle should exist")
    }

    /// Runs until `s` seconds of simulated time
    pub fn run_until(&mut self, s: f64) -> u64 {
        self.sim.run_until(secs(s))
    }

    /// The RIC's repository
    pub fn data(&self) -> &DataRepository {
        self.sim.ric().data()
    }
}

/// Logic module that asks every registered base station for the same power change
#[derive(Debug)]
pub struct ScriptedLm {
    name: String,
    delay: RandomVariable,
    delta_db: f64,
}

impl ScriptedLm {
    pub fn new(name: &str, delay: RandomVariable, delta_db: f64) -> Self {
        Self {
            name: name.to_string(),
            delay,
            delta_db,
        }
    }
}

impl LogicModule for ScriptedLm {
    fn name(&self) -> &str {
        &self.name
    }

    fn processing_delay(&self) -> &RandomVariable {
        &self.delay
    }

    fn run(&mut self, now: SimTime, data: &mut DataRepository) -> Vec<Command> {
        data.node_ids(NodeType::BaseStation)
            .into_iter()
            .map(|enb| {
                let command = Command::tx_power_delta(enb, self.delta_db);
                data.log_command_lm(&self.name, &command, now);
                command
            })
            .collect()
    }
}
