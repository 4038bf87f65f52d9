//! Report ingress integration tests
//!
//! Bad reports must be dropped one by one without disturbing the valid
//! stream behind them.

use oransim_common::{NodeId, Position, RandomVariable};
use oransim_ric::{Report, ReportPayload, RsrpRsrq};

use integration_tests::{init_test_logging, secs, BsState, TestNetwork, TestScenario, UeState};

fn network() -> TestNetwork {
    TestScenario::new()
        .base_station(BsState::new(1))
        .ue(UeState::attached(1, 7).with_rsrp(1, -90.0))
        .build()
}

#[test]
fn test_report_from_unknown_node_ignored() {
    init_test_logging();

    let mut net = network();
    net.sim.start();
    net.run_until(1.5);
    let stored_before = net.sim.ric().e2().stats().reports_stored;
    assert!(stored_before > 0);

    let stranger = NodeId::new(999);
    let report = Report::new(
        stranger,
        secs(1.5),
        ReportPayload::Location {
            position: Position::new(1.0, 2.0, 3.0),
        },
    );
    net.sim.ric_mut().receive_report(&report, secs(1.5));

    assert_eq!(net.sim.ric().e2().stats().reports_dropped, 1);
    assert!(net.data().node(stranger).is_none());
    assert!(net.data().get_location(stranger, secs(0.0), secs(10.0)).is_empty());

    // The regular stream carries on
    net.run_until(3.5);
    assert!(net.sim.ric().e2().stats().reports_stored > stored_before);
    let ue = net.node_id(net.ues[0].handle);
    assert_eq!(net.data().get_location(ue, secs(0.0), secs(3.5)).len(), 3);
}

#[test]
fn test_report_kind_mismatch_dropped() {
    init_test_logging();

    let mut net = network();
    net.sim.start();
    net.run_until(1.5);

    // Serving-cell info only makes sense for a UE
    let enb = net.node_id(net.base_stations[0].handle);
    let report = Report::new(enb, secs(1.5), ReportPayload::CellInfo { cell_id: 1, rnti: 7 });
    net.sim.ric_mut().receive_report(&report, secs(1.5));

    assert_eq!(net.sim.ric().e2().stats().reports_dropped, 1);
    assert!(net.data().latest_ue_cell_info(enb, secs(2.0)).is_none());
}

#[test]
fn test_non_finite_measurement_dropped() {
    init_test_logging();

    let mut net = network();
    net.sim.start();
    net.run_until(1.5);

    let ue = net.node_id(net.ues[0].handle);
    let report = Report::new(
        ue,
        secs(1.5),
        ReportPayload::RsrpRsrq(RsrpRsrq {
            rnti: 7,
            cell_id: 1,
            rsrp: f64::NAN,
            rsrq: -10.0,
            is_serving_cell: true,
            carrier_id: 0,
        }),
    );
    let before = net.data().get_rsrp_rsrq(ue, secs(0.0), secs(2.0)).len();
    net.sim.ric_mut().receive_report(&report, secs(1.5));

    assert_eq!(net.sim.ric().e2().stats().reports_dropped, 1);
    assert_eq!(net.data().get_rsrp_rsrq(ue, secs(0.0), secs(2.0)).len(), before);
}

#[test]
fn test_inactive_ric_ignores_reports() {
    init_test_logging();

    let mut net = network();
    let report = Report::new(NodeId::new(1), secs(0.0), ReportPayload::EnbCellInfo { cell_id: 1 });
    net.sim.ric_mut().receive_report(&report, secs(0.0));

    assert_eq!(net.sim.ric().e2().stats().reports_dropped, 0);
    assert_eq!(net.data().samples_stored(), 0);
}

#[test]
fn test_delayed_reports_read_back_sorted() {
    init_test_logging();

    let mut net = TestScenario::new()
        .with_seed(11)
        .with_send_interval(0.1)
        .with_transmission_delay(RandomVariable::uniform(0.0, 0.35))
        .base_station(BsState::new(1))
        .ue(UeState::attached(1, 7).with_rsrp(1, -90.0))
        .build();
    net.sim.start();
    net.run_until(5.0);

    let ue = net.node_id(net.ues[0].handle);
    let samples = net.data().get_location(ue, secs(0.0), secs(5.0));
    assert!(samples.len() > 20);
    assert!(samples.windows(2).all(|w| w[0].0 <= w[1].0));

    // Inclusive range bounds
    let (first, last) = (samples[2].0, samples[5].0);
    let window = net.data().get_location(ue, first, last);
    assert_eq!(window.len(), 4);
    assert_eq!(window[0].0, first);
    assert_eq!(window[3].0, last);
}
