//! RSRP handover integration tests
//!
//! Drives the handover logic module through registered mock base stations
//! and UEs and checks what reaches the serving base station.

use oransim_common::{ConflictMitigationPolicy, RsrpHandoverConfig};
use oransim_ric::{Command, RsrpHandoverLm, ServingCell};

use integration_tests::{
    dispatched_commands, init_test_logging, lm_commands, secs, BsState, TestScenario, UeState,
};

fn handover_lm() -> RsrpHandoverLm {
    RsrpHandoverLm::new(RsrpHandoverConfig {
        hysteresis_margin_db: 3.0,
        time_window_s: 1.0,
        hold_off_s: 1.5,
        ..RsrpHandoverConfig::default()
    })
    .expect("should create handover module")
}

fn two_cells(query_interval_s: f64, ue: UeState) -> TestScenario {
    TestScenario::new()
        .with_query_interval(query_interval_s)
        .with_send_interval(0.5)
        .base_station(BsState::new(1))
        .base_station(BsState::new(2))
        .ue(ue)
        .logic_module(handover_lm())
}

/// Serving -90 dBm, neighbor -80 dBm on two ticks 2 s apart: one handover,
/// addressed to the serving base station
#[test]
fn test_single_handover_to_serving_base_station() {
    init_test_logging();

    let ue = UeState::attached(1, 7).with_rsrp(1, -90.0).with_rsrp(2, -80.0);
    let mut net = two_cells(2.0, ue).build();
    net.sim.start();
    net.run_until(2.0);

    let serving_enb = net.node_id(net.base_stations[0].handle);
    let proposed = lm_commands(net.data(), RsrpHandoverLm::NAME);
    assert_eq!(proposed, vec![(secs(2.0), Command::handover(serving_enb, 7, 2))]);
    assert_eq!(net.base_stations[0].state.borrow().handovers, vec![(7, 2)]);
    assert!(net.base_stations[1].state.borrow().handovers.is_empty());

    // The handover took effect: the UE is now in cell 2 with a new RNTI
    net.ues[0].state.borrow_mut().serving = Some(ServingCell { cell_id: 2, rnti: 3 });
    net.run_until(6.0);

    assert_eq!(lm_commands(net.data(), RsrpHandoverLm::NAME).len(), 1);
    assert_eq!(net.base_stations[0].state.borrow().handovers.len(), 1);
}

#[test]
fn test_hold_off_spaces_handovers() {
    init_test_logging();

    // The RRC refuses, so the UE keeps qualifying on every tick
    let ue = UeState::attached(1, 7).with_rsrp(1, -90.0).with_rsrp(2, -80.0);
    let mut net = two_cells(0.5, ue).build();
    net.base_stations[0].state.borrow_mut().accept_handovers = false;
    net.sim.start();
    net.run_until(4.2);

    let times: Vec<_> = lm_commands(net.data(), RsrpHandoverLm::NAME)
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(times, vec![secs(1.0), secs(2.5), secs(4.0)]);
    for pair in times.windows(2) {
        assert!(pair[1].duration_since(pair[0]).as_secs_f64() >= 1.5);
    }

    // Rejected at the RRC, so the terminator counted them as dropped
    let enb = net.sim.terminator(net.base_stations[0].handle).expect("terminator");
    assert_eq!(enb.stats().commands_dropped, 3);
    assert_eq!(enb.stats().commands_applied, 0);
}

#[test]
fn test_below_hysteresis_no_handover() {
    init_test_logging();

    let ue = UeState::attached(1, 7).with_rsrp(1, -90.0).with_rsrp(2, -88.0);
    let mut net = two_cells(0.5, ue).build();
    net.sim.start();
    net.run_until(5.0);

    assert!(lm_commands(net.data(), RsrpHandoverLm::NAME).is_empty());
    assert!(net.base_stations[0].state.borrow().handovers.is_empty());
    assert!(net.sim.ric().stats().queries >= 9);
}

#[test]
fn test_unmapped_target_cell_suppressed() {
    init_test_logging();

    // Cell 3 is measured but no registered base station serves it
    let ue = UeState::attached(1, 7)
        .with_rsrp(1, -95.0)
        .with_rsrp(2, -94.0)
        .with_rsrp(3, -70.0);
    let mut net = two_cells(1.0, ue).build();
    net.sim.start();
    net.run_until(5.0);

    assert!(lm_commands(net.data(), RsrpHandoverLm::NAME).is_empty());
    assert!(dispatched_commands(net.data()).is_empty());
}

#[test]
fn test_unknown_serving_cell_skipped() {
    init_test_logging();

    let ue = UeState::default().with_rsrp(1, -90.0).with_rsrp(2, -70.0);
    let mut net = two_cells(1.0, ue).build();
    net.sim.start();
    net.run_until(5.0);

    assert!(lm_commands(net.data(), RsrpHandoverLm::NAME).is_empty());
}

fn duplicate_handovers(policy: ConflictMitigationPolicy) -> usize {
    let ue = UeState::attached(1, 7).with_rsrp(1, -90.0).with_rsrp(2, -80.0);
    let mut net = two_cells(2.0, ue)
        .logic_module(handover_lm())
        .with_conflict_mitigation(policy)
        .build();
    net.sim.start();
    net.run_until(2.0);
    assert_eq!(lm_commands(net.data(), RsrpHandoverLm::NAME).len(), 2);
    dispatched_commands(net.data()).len()
}

#[test]
fn test_conflict_mitigation_policies() {
    init_test_logging();

    assert_eq!(duplicate_handovers(ConflictMitigationPolicy::PassThrough), 2);
    assert_eq!(duplicate_handovers(ConflictMitigationPolicy::SuppressDuplicates), 1);
}
