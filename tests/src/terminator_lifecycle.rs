//! Terminator lifecycle integration tests
//!
//! Registration, keep-alive, deregistration and expiry as seen from both
//! ends of the E2 link.

use oransim_common::{NodeType, RandomVariable};
use oransim_ric::TerminatorState;

use integration_tests::{
    dispatched_commands, init_test_logging, lm_commands, secs, BsState, ScriptedLm, TestNetwork,
    TestScenario, UeState,
};

fn network(delay_s: f64) -> TestNetwork {
    TestScenario::new()
        .with_transmission_delay(RandomVariable::constant(delay_s))
        .base_station(BsState::new(1))
        .base_station(BsState::new(2))
        .ue(UeState::attached(1, 7).with_rsrp(1, -90.0))
        .build()
}

fn assert_id_matches_state(net: &TestNetwork) {
    for t in net.sim.terminators() {
        assert_eq!(
            t.node_id().is_registered(),
            t.state() == TerminatorState::Active,
            "{} at {}: state {} with node id {}",
            t.name(),
            net.sim.now(),
            t.state(),
            t.node_id()
        );
    }
}

#[test]
fn test_node_id_zero_unless_active() {
    init_test_logging();

    let mut net = network(0.1);
    assert_id_matches_state(&net);
    net.sim.start();
    assert_id_matches_state(&net);

    for _ in 0..300 {
        assert!(net.sim.step());
        assert_id_matches_state(&net);
    }

    let handle = net.base_stations[0].handle;
    net.sim.deactivate_terminator(handle).expect("deactivate");
    assert_id_matches_state(&net);
    net.sim.activate_terminator(handle).expect("activate");
    assert_id_matches_state(&net);
    for _ in 0..50 {
        net.sim.step();
        assert_id_matches_state(&net);
    }
}

#[test]
fn test_registration_takes_round_trip() {
    init_test_logging();

    let mut net = network(0.1);
    net.sim.start();
    net.run_until(0.15);
    let t = net.sim.terminator(net.ues[0].handle).expect("terminator");
    assert_eq!(t.state(), TerminatorState::Registering);

    net.run_until(0.2);
    let t = net.sim.terminator(net.ues[0].handle).expect("terminator");
    assert_eq!(t.state(), TerminatorState::Active);
    assert!(net.data().is_registered(t.node_id()));
    assert_eq!(net.data().node_ids(NodeType::BaseStation).len(), 2);
    assert_eq!(net.data().node_ids(NodeType::MobileUnit).len(), 1);
}

#[test]
fn test_double_deactivate_sends_one_deregistration() {
    init_test_logging();

    let mut net = network(0.0);
    net.sim.start();
    net.run_until(1.0);
    let handle = net.ues[0].handle;
    let id = net.node_id(handle);

    net.sim.deactivate_terminator(handle).expect("deactivate");
    net.sim.deactivate_terminator(handle).expect("deactivate");
    net.run_until(1.5);

    let stats = net.sim.ric().e2().stats();
    assert_eq!(stats.deregistrations, 1);
    assert!(net.sim.ric().e2().node(id).is_none());
    assert!(!net.data().is_registered(id));
    assert_eq!(
        net.sim.terminator(handle).map(|t| t.state()),
        Some(TerminatorState::Inactive)
    );
}

#[test]
fn test_keep_alive_holds_ids() {
    init_test_logging();

    let mut net = network(0.05);
    net.sim.start();
    net.run_until(1.0);
    let ids: Vec<_> = net.sim.terminators().iter().map(|t| t.node_id()).collect();

    net.run_until(60.0);
    let later: Vec<_> = net.sim.terminators().iter().map(|t| t.node_id()).collect();
    assert_eq!(ids, later);
    assert_eq!(net.sim.ric().e2().stats().expired, 0);
    assert_eq!(net.sim.ric().e2().stats().ids_granted, 3);
}

#[test]
fn test_slow_keep_alive_expires_and_reregisters() {
    init_test_logging();

    let mut scenario = TestScenario::new().base_station(BsState::new(1));
    scenario.terminator.registration_interval = RandomVariable::constant(5.0);
    scenario.ric.e2_node_inactivity_interval = RandomVariable::constant(1.0);
    let mut net = scenario.build();
    let handle = net.base_stations[0].handle;

    net.sim.start();
    net.run_until(0.5);
    let first = net.node_id(handle);
    assert!(first.is_registered());

    // Threshold is 2 s; the sweep at 3 s removes the node
    net.run_until(3.5);
    assert!(net.sim.ric().e2().node(first).is_none());
    assert!(!net.data().is_registered(first));

    // The keep-alive at 5 s carries a stale id and gets a fresh one
    net.run_until(5.5);
    let second = net.node_id(handle);
    assert!(second.is_registered());
    assert_ne!(first, second);
    assert!(net.sim.ric().e2().stats().expired >= 1);
}

#[test]
fn test_reactivation_gets_new_id() {
    init_test_logging();

    let mut net = network(0.0);
    net.sim.start();
    net.run_until(1.0);
    let handle = net.base_stations[1].handle;
    let first = net.node_id(handle);

    net.sim.deactivate_terminator(handle).expect("deactivate");
    net.run_until(2.0);
    net.sim.activate_terminator(handle).expect("activate");
    net.run_until(3.0);

    let second = net.node_id(handle);
    assert!(second.is_registered());
    assert!(second > first);
}

#[test]
fn test_stop_deactivates_everything() {
    init_test_logging();

    let mut net = network(0.0);
    net.sim.start();
    net.run_until(2.0);
    net.sim.stop();

    assert!(!net.sim.ric().is_active());
    assert!(!net.data().is_active());
    for t in net.sim.terminators() {
        assert_eq!(t.state(), TerminatorState::Inactive);
        assert!(!t.node_id().is_registered());
    }
}

#[test]
fn test_silent_node_gets_no_commands_before_sweep() {
    init_test_logging();

    // Keep-alive every 5 s against a 2 s threshold; the periodic sweep only runs at 10 s
    let mut scenario = TestScenario::new()
        .with_query_interval(1.0)
        .base_station(BsState::new(1))
        .logic_module(ScriptedLm::new("scripted", RandomVariable::constant(0.0), 1.0));
    scenario.terminator.registration_interval = RandomVariable::constant(5.0);
    scenario.ric.e2_node_inactivity_interval = RandomVariable::constant(10.0);
    let mut net = scenario.build();
    let handle = net.base_stations[0].handle;

    net.sim.start();
    net.run_until(4.5);

    // Registered at 0: fresh at the queries at 1 and 2, stale from 3 on
    let times: Vec<_> = dispatched_commands(net.data()).into_iter().map(|(t, _)| t).collect();
    assert_eq!(times, vec![secs(1.0), secs(2.0)]);
    assert_eq!(lm_commands(net.data(), "scripted").len(), 2);
    assert_eq!(net.base_stations[0].state.borrow().tx_power_dbm, 45.0);
    assert_eq!(net.sim.ric().e2().stats().expired, 1);

    // The terminator still believes it holds its id
    let stale = net.node_id(handle);
    assert!(stale.is_registered());
    assert!(net.sim.ric().e2().node(stale).is_none());
    assert!(net.sim.ric().e2().stats().reports_dropped > 0);
}

#[test]
fn test_registration_interval_above_threshold_warns() {
    init_test_logging();

    let mut scenario = TestScenario::new()
        .base_station(BsState::new(1))
        .ue(UeState::attached(1, 7));
    scenario.terminator.registration_interval = RandomVariable::constant(2.5);
    let mut net = scenario.build();

    assert!(net.sim.terminators().iter().all(|t| t.stats().config_warnings == 0));
    net.sim.start();
    for t in net.sim.terminators() {
        assert_eq!(t.stats().config_warnings, 1, "{}", t.name());
    }
}

#[test]
fn test_registration_interval_within_threshold_does_not_warn() {
    init_test_logging();

    // Equal to the 2 s threshold, then the 1 s default
    for interval_s in [2.0, 1.0] {
        let mut scenario = TestScenario::new()
            .base_station(BsState::new(1))
            .ue(UeState::attached(1, 7));
        scenario.terminator.registration_interval = RandomVariable::constant(interval_s);
        let mut net = scenario.build();

        net.sim.start();
        net.run_until(10.0);
        for t in net.sim.terminators() {
            assert_eq!(t.stats().config_warnings, 0, "{} at {interval_s}s", t.name());
        }
        assert_eq!(net.sim.ric().e2().stats().expired, 0);
    }
}
