use super::harness::{Harness, mesh};
use crate::net::NodeId;
use crate::proto::{ErrorCode, Header, ProtocolConfig, RerouteStrategy, WavelengthPolicy};
use crate::sim::SimTime;
use crate::topo::build_ring;

use super::harness::template;

const A: usize = 0;
const B: usize = 1;
const C: usize = 2;
const D: usize = 3;

fn chain(wavelengths: u32) -> crate::net::Topology {
    mesh(4, &[(A, B), (B, C), (C, D)], wavelengths)
}

#[test]
fn label_set_never_grows_along_path() {
    let mut h = Harness::new(chain(4), ProtocolConfig::default());
    h.occupy(A, B, &[0]);
    h.occupy(B, C, &[1]);
    h.occupy(C, D, &[2]);
    h.request(SimTime::ZERO, A, D, 1.0);
    h.run_until(SimTime::from_millis(100));

    let counts: Vec<u32> = h
        .arrivals(Header::Path)
        .iter()
        .map(|(_, _, m)| m.label_set.as_ref().expect("PATH carries label set").count_available())
        .collect();
    assert_eq!(counts, vec![4, 3, 2, 1]);
    assert!(counts.windows(2).all(|w| w[1] <= w[0]));

    let conn = h
        .control
        .router(NodeId(A))
        .and_then(|r| r.active_connections().values().next())
        .expect("connection at source");
    assert_eq!(conn.wavelength, 3);
    assert_eq!(conn.route, vec![NodeId(A), NodeId(B), NodeId(C), NodeId(D)]);
}

#[test]
fn reserve_then_teardown_restores_every_mask() {
    let mut h = Harness::new(chain(2), ProtocolConfig::default());
    h.request(SimTime::ZERO, A, D, 0.5);
    h.run_until(SimTime::from_millis(100));

    assert_eq!(h.control.stats().established, 1);
    assert_eq!(h.available(A, B), 1);
    assert_eq!(h.available(B, C), 1);
    assert_eq!(h.available(C, D), 1);
    // 反方向不受影响
    assert_eq!(h.available(D, C), 2);
    h.control.verify_masks().expect("masks consistent");

    h.run();
    let stats = h.control.stats();
    assert_eq!(stats.removed, 1);
    assert_eq!(stats.suppressed_teardowns, 0);
    for r in h.control.routers() {
        assert!(r.active_connections().is_empty(), "{} still holds state", r.id());
        assert!(!r.has_any_crankback_state());
        for (_, link) in r.links().iter() {
            assert_eq!(link.mask.count_available(), 2);
        }
    }
}

#[test]
fn resv_tear_releases_backward_and_reports_at_source() {
    use crate::proto::{Packet, SignalingMessage};
    use crate::sim::EventKind;

    let mut h = Harness::new(chain(2), ProtocolConfig::default());
    h.request(SimTime::ZERO, A, D, 10.0);
    h.run_until(SimTime::from_millis(100));
    let conn = h
        .control
        .router(NodeId(D))
        .and_then(|r| r.active_connections().values().next().cloned())
        .expect("target holds connection");

    h.schedule(
        SimTime::from_millis(200),
        EventKind::PacketArrival {
            to: NodeId(D),
            from: None,
            packet: Packet::Signaling(SignalingMessage::for_connection(Header::ResvTear, &conn)),
        },
    );
    h.run_until(SimTime::from_millis(300));

    assert_eq!(h.control.stats().removed, 1);
    for r in h.control.routers() {
        assert!(r.active_connections().is_empty());
    }
    assert_eq!(h.available(A, B), 2);
    assert_eq!(h.available(B, C), 2);
    assert_eq!(h.available(C, D), 2);

    // 源端已没有该实例，保持时间到时的拆除被抑制
    h.run();
    assert_eq!(h.control.stats().suppressed_teardowns, 1);
    assert_eq!(h.control.stats().removed, 1);
}

#[test]
fn ring_crankback_takes_alternate_neighbor() {
    let cfg = ProtocolConfig {
        reroute: RerouteStrategy::Segment,
        ..ProtocolConfig::default()
    };
    let mut h = Harness::new(build_ring(4, &template(2)), cfg);
    h.occupy(A, B, &[0, 1]);
    h.request(SimTime::ZERO, A, C, 1.0);
    h.run_until(SimTime::from_millis(500));

    // B 收到空的候选集合，RP_LABEL_SET 直接回到源节点
    let errs = h.arrivals(Header::PathErr);
    assert_eq!(errs.len(), 1);
    let (to, from, m) = errs[0];
    assert_eq!((to, from), (NodeId(A), Some(NodeId(B))));
    assert_eq!(m.error, Some(ErrorCode::WavelengthUnavailable));

    let stats = h.control.stats();
    assert_eq!(stats.established, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.crankbacks, 1);
    assert_eq!(stats.end_to_end_retries, 0);
    assert_eq!(h.control.router(NodeId(A)).map(|r| r.crankbacks()), Some(1));
    assert_eq!(h.control.router(NodeId(B)).map(|r| r.crankbacks()), Some(0));

    let conn = h
        .control
        .router(NodeId(A))
        .and_then(|r| r.active_connections().values().next())
        .expect("established at source");
    assert_eq!(conn.route, vec![NodeId(A), NodeId(D), NodeId(C)]);
    for r in h.control.routers() {
        assert!(!r.has_any_crankback_state(), "{} kept crankback state", r.id());
    }
}

#[test]
fn ring_end_to_end_retry_rotates_source_candidates() {
    let mut h = Harness::new(build_ring(4, &template(2)), ProtocolConfig::default());
    h.occupy(B, C, &[0, 1]);
    h.request(SimTime::ZERO, A, C, 1.0);
    h.run_until(SimTime::from_millis(500));

    let stats = h.control.stats();
    assert_eq!(stats.established, 1);
    assert_eq!(stats.crankbacks, 0);
    assert_eq!(stats.end_to_end_retries, 1);
    let conn = h
        .control
        .router(NodeId(A))
        .and_then(|r| r.active_connections().values().next())
        .expect("established at source");
    assert_eq!(conn.route, vec![NodeId(A), NodeId(D), NodeId(C)]);
    assert_eq!(conn.request.current_try, 1);
}

#[test]
fn no_reroute_fails_on_first_error() {
    let cfg = ProtocolConfig {
        reroute: RerouteStrategy::None,
        ..ProtocolConfig::default()
    };
    let mut h = Harness::new(build_ring(4, &template(2)), cfg);
    h.occupy(B, C, &[0, 1]);
    h.request(SimTime::ZERO, A, C, 1.0);
    h.run();

    let stats = h.control.stats();
    assert_eq!(stats.established, 0);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.failed_by_error.get("RP_LABEL_SET"), Some(&1));
    assert_eq!(stats.blocking_probability(), 1.0);
}

#[test]
fn request_between_identical_endpoints_fails_immediately() {
    let mut h = Harness::new(chain(2), ProtocolConfig::default());
    h.request(SimTime::ZERO, B, B, 1.0);
    h.run();
    let stats = h.control.stats();
    assert_eq!(stats.requests, 1);
    assert_eq!(stats.failed_by_error.get("RP_NO_ROUTE_AVAILABLE"), Some(&1));
}

#[test]
fn hop_budget_exhaustion_reports_no_route() {
    let cfg = ProtocolConfig {
        reroute: RerouteStrategy::None,
        max_hops: 2,
        ..ProtocolConfig::default()
    };
    let mut h = Harness::new(chain(2), cfg);
    h.request(SimTime::ZERO, A, D, 1.0);
    h.run();
    let stats = h.control.stats();
    assert_eq!(stats.failed_by_error.get("RP_NO_ROUTE_AVAILABLE"), Some(&1));
    for r in h.control.routers() {
        assert!(r.active_connections().is_empty());
        assert!(!r.has_any_crankback_state());
    }
}

#[test]
fn least_used_policy_prefers_idle_wavelength() {
    let cfg = ProtocolConfig {
        wavelength_policy: WavelengthPolicy::LeastUsed,
        ..ProtocolConfig::default()
    };
    let mut h = Harness::new(chain(3), cfg);
    // λ0 在别处被大量使用，λ1 用了一次，λ2 空闲
    h.occupy(D, C, &[0, 1]);
    h.occupy(C, B, &[0]);
    h.request(SimTime::ZERO, A, B, 1.0);
    h.run_until(SimTime::from_millis(100));
    let conn = h
        .control
        .router(NodeId(A))
        .and_then(|r| r.active_connections().values().next())
        .expect("established");
    assert_eq!(conn.wavelength, 2);
    assert_eq!(WavelengthPolicy::MostUsed.order(&[2, 1, 0]), vec![0, 1, 2]);
    assert_eq!(WavelengthPolicy::LeastUsed.order(&[1, 0, 1]), vec![1, 0, 2]);
    assert_eq!(WavelengthPolicy::FirstFit.order(&[5, 5]), vec![0, 1]);
}
