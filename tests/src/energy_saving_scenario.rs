//! Energy-saving integration tests
//!
//! Telemetry is scripted between ticks: the RIC queries at whole seconds
//! and sees what the mocks reported during the preceding second.

use oransim_common::{EnergySavingConfig, FlatEnergySavingConfig, NodeId};
use oransim_ric::{Command, EnergySavingLm, FlatEnergySavingLm};

use integration_tests::{
    init_test_logging, lm_commands, secs, BsState, TestNetwork, TestScenario, UeState,
};

fn controller() -> EnergySavingConfig {
    EnergySavingConfig {
        target_efficiency_bits_per_joule: 1000.0,
        step_size_db: 1.0,
        ..EnergySavingConfig::default()
    }
}

fn scenario(cells: &[u16]) -> TestScenario {
    let mut scenario = TestScenario::new()
        .with_query_interval(1.0)
        .with_send_interval(0.25)
        .ue(UeState::attached(cells[0], 1));
    for &cell in cells {
        scenario = scenario.base_station(BsState::new(cell));
    }
    scenario
}

fn set_traffic(net: &TestNetwork, rx_bytes: u64) {
    let mut ue = net.ues[0].state.borrow_mut();
    ue.rx_bytes = rx_bytes;
    ue.tx_bytes = rx_bytes;
}

fn set_energy(net: &TestNetwork, bs: usize, energy_j: f64) {
    net.base_stations[bs].state.borrow_mut().energy_j = energy_j;
}

/// Warm-up, then 500 bits/J (raise), then 1500 bits/J (lower)
#[test]
fn test_feedback_around_target() {
    init_test_logging();

    let mut net = scenario(&[1])
        .logic_module(EnergySavingLm::new(controller()).expect("lm"))
        .build();
    net.sim.start();

    // Tick 1: warm-up, whatever the inputs
    set_traffic(&net, 12_345);
    net.run_until(1.0);
    assert!(lm_commands(net.data(), EnergySavingLm::NAME).is_empty());

    // Tick 2: 5000 bits over 10 J
    set_traffic(&net, 12_345 + 625);
    set_energy(&net, 0, 9_990.0);
    net.run_until(2.0);
    let enb = net.node_id(net.base_stations[0].handle);
    assert_eq!(
        lm_commands(net.data(), EnergySavingLm::NAME),
        vec![(secs(2.0), Command::tx_power_delta(enb, 1.0))]
    );
    assert_eq!(net.base_stations[0].state.borrow().tx_power_dbm, 44.0);

    // Tick 3: 15000 bits over 10 J
    set_traffic(&net, 12_345 + 625 + 1_875);
    set_energy(&net, 0, 9_980.0);
    net.run_until(3.0);
    let proposed = lm_commands(net.data(), EnergySavingLm::NAME);
    assert_eq!(proposed.len(), 2);
    assert_eq!(proposed[1], (secs(3.0), Command::tx_power_delta(enb, -1.0)));
    assert_eq!(net.base_stations[0].state.borrow().tx_power_dbm, 43.0);
}

#[test]
fn test_no_traffic_no_command() {
    init_test_logging();

    let mut net = scenario(&[1])
        .logic_module(EnergySavingLm::new(controller()).expect("lm"))
        .build();
    net.sim.start();
    net.run_until(1.0);

    // Energy drops but nothing is delivered
    set_energy(&net, 0, 9_000.0);
    net.run_until(2.0);
    // Traffic flows but energy stays flat
    set_traffic(&net, 10_000);
    net.run_until(3.0);

    assert!(lm_commands(net.data(), EnergySavingLm::NAME).is_empty());
}

#[test]
fn test_dead_band_holds_power() {
    init_test_logging();

    let config = EnergySavingConfig {
        epsilon: 100.0,
        ..controller()
    };
    let mut net = scenario(&[1]).logic_module(EnergySavingLm::new(config).expect("lm")).build();
    net.sim.start();
    net.run_until(1.0);

    // 9600 bits over 10 J: inside 1000 +- 100
    set_traffic(&net, 1_200);
    set_energy(&net, 0, 9_990.0);
    net.run_until(2.0);

    assert!(lm_commands(net.data(), EnergySavingLm::NAME).is_empty());
    assert_eq!(net.base_stations[0].state.borrow().tx_power_dbm, 43.0);
}

#[test]
fn test_per_base_station_decisions() {
    init_test_logging();

    let mut net = scenario(&[1, 2])
        .logic_module(EnergySavingLm::new(controller()).expect("lm"))
        .build();
    net.sim.start();
    net.run_until(1.0);

    // 5000 bits; cell 1 spends 10 J (500 bits/J), cell 2 spends 2 J (2500 bits/J)
    set_traffic(&net, 625);
    set_energy(&net, 0, 9_990.0);
    set_energy(&net, 1, 9_998.0);
    net.run_until(2.0);

    let enb1 = net.node_id(net.base_stations[0].handle);
    let enb2 = net.node_id(net.base_stations[1].handle);
    let mut proposed: Vec<(NodeId, Command)> = lm_commands(net.data(), EnergySavingLm::NAME)
        .into_iter()
        .map(|(_, c)| (c.target(), c))
        .collect();
    proposed.sort_by_key(|(id, _)| *id);
    assert_eq!(
        proposed,
        vec![
            (enb1, Command::tx_power_delta(enb1, 1.0)),
            (enb2, Command::tx_power_delta(enb2, -1.0)),
        ]
    );
    assert_eq!(net.base_stations[0].state.borrow().tx_power_dbm, 44.0);
    assert_eq!(net.base_stations[1].state.borrow().tx_power_dbm, 42.0);
}

#[test]
fn test_flat_variant_broadcasts() {
    init_test_logging();

    let flat = FlatEnergySavingLm::new(FlatEnergySavingConfig {
        controller: controller(),
    })
    .expect("lm");
    let mut net = scenario(&[1, 2]).logic_module(flat).build();
    net.sim.start();
    net.run_until(1.0);

    // Same inputs as above: network-wide 5000 bits over 12 J, below target
    set_traffic(&net, 625);
    set_energy(&net, 0, 9_990.0);
    set_energy(&net, 1, 9_998.0);
    net.run_until(2.0);

    let proposed = lm_commands(net.data(), FlatEnergySavingLm::NAME);
    assert_eq!(proposed.len(), 2);
    assert!(proposed
        .iter()
        .all(|(_, c)| *c == Command::tx_power_delta(c.target(), 1.0)));
    assert_eq!(net.base_stations[0].state.borrow().tx_power_dbm, 44.0);
    assert_eq!(net.base_stations[1].state.borrow().tx_power_dbm, 44.0);
}

#[test]
fn test_restart_warms_up_again() {
    init_test_logging();

    let mut net = scenario(&[1])
        .logic_module(EnergySavingLm::new(controller()).expect("lm"))
        .build();
    net.sim.start();
    net.run_until(1.0);
    set_traffic(&net, 625);
    set_energy(&net, 0, 9_990.0);
    net.run_until(2.0);
    assert_eq!(lm_commands(net.data(), EnergySavingLm::NAME).len(), 1);

    net.sim.stop();
    net.sim.start();

    // Would be 500 bits/J against the old baselines
    set_traffic(&net, 1_250);
    set_energy(&net, 0, 9_980.0);
    net.run_until(3.0);
    assert_eq!(lm_commands(net.data(), EnergySavingLm::NAME).len(), 1);
}
