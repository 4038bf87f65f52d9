//! Reproducibility tests
//!
//! Every delay is random here; a fixed seed must still give the same
//! timeline, event for event.

use oransim_common::{LateCommandPolicy, RandomVariable, RsrpHandoverConfig};
use oransim_ric::repository::{CommandLogEntry, LmQueryLogEntry};
use oransim_ric::RsrpHandoverLm;

use integration_tests::{init_test_logging, BsState, ScriptedLm, TestScenario, UeState};

struct Outcome {
    commands: Vec<CommandLogEntry>,
    queries: Vec<LmQueryLogEntry>,
    events: u64,
    tx_power_dbm: f64,
}

fn run(seed: u64) -> Outcome {
    let handover = RsrpHandoverLm::new(RsrpHandoverConfig {
        processing_delay: RandomVariable::Exponential {
            mean: 0.1,
            bound: 0.6,
        },
        ..RsrpHandoverConfig::default()
    })
    .expect("lm");
    let scripted = ScriptedLm::new(
        "scripted",
        RandomVariable::Uniform { min: 0.0, max: 0.6 },
        0.5,
    );

    let mut scenario = TestScenario::new()
        .with_seed(seed)
        .with_query_interval(1.0)
        .with_max_wait(0.3, LateCommandPolicy::Save)
        .with_transmission_delay(RandomVariable::uniform(0.001, 0.05))
        .base_station(BsState::new(1))
        .base_station(BsState::new(2))
        .ue(UeState::attached(1, 7).with_rsrp(1, -95.0).with_rsrp(2, -85.0))
        .ue(UeState::attached(2, 9).with_rsrp(1, -80.0).with_rsrp(2, -90.0))
        .logic_module(handover)
        .logic_module(scripted);
    scenario.terminator.send_interval = RandomVariable::Normal {
        mean: 0.3,
        std_dev: 0.05,
    };
    let mut net = scenario.build();
    for bs in &net.base_stations {
        bs.state.borrow_mut().accept_handovers = false;
    }

    net.sim.start();
    let events = net.run_until(20.0);
    let tx_power_dbm = net.base_stations[0].state.borrow().tx_power_dbm;
    Outcome {
        commands: net.data().command_log().to_vec(),
        queries: net.data().query_log().to_vec(),
        events,
        tx_power_dbm,
    }
}

#[test]
fn test_same_seed_same_run() {
    init_test_logging();

    let a = run(5);
    let b = run(5);
    assert!(!a.commands.is_empty());
    assert_eq!(a.commands, b.commands);
    assert_eq!(a.queries, b.queries);
    assert_eq!(a.events, b.events);
    assert_eq!(a.tx_power_dbm, b.tx_power_dbm);
}

#[test]
fn test_different_seed_different_delays() {
    init_test_logging();

    let a = run(5);
    let b = run(6);
    let delays = |o: &Outcome| -> Vec<f64> {
        o.queries.iter().map(|q| q.processing_delay_s).collect()
    };
    assert_eq!(a.queries.len(), b.queries.len());
    assert_ne!(delays(&a), delays(&b));
}
