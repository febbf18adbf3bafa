use super::harness::{Harness, mesh, template};
use crate::net::{KShortestPaths, NodeId};
use crate::proto::{
    ErrorCode, FailureNotice, Header, Packet, ProtocolConfig, RerouteStrategy, Router, RouterCtx,
    SignalingMessage,
};
use crate::sim::{EventKind, SimTime};
use crate::topo::build_ring;

const A: usize = 0;
const B: usize = 1;
const C: usize = 2;
const D: usize = 3;

#[test]
fn link_failure_unwinds_both_surviving_segments() {
    let cfg = ProtocolConfig {
        reroute: RerouteStrategy::None,
        ..ProtocolConfig::default()
    };
    let mut h = Harness::new(mesh(4, &[(A, B), (B, C), (C, D)], 2), cfg);
    h.request(SimTime::ZERO, A, D, 10.0);
    h.run_until(SimTime::from_millis(100));
    assert_eq!(h.control.stats().established, 1);
    assert_eq!(h.available(A, B), 1);
    assert_eq!(h.available(C, D), 1);

    h.schedule(
        SimTime::from_millis(200),
        EventKind::FailureLink {
            a: NodeId(B),
            b: NodeId(C),
        },
    );
    h.run_until(SimTime::from_millis(400));

    // B 向 A 发出 PATH_ERR(LSP_FAILURE)，C 向 D 发出 PATH_TEAR
    let lsp: Vec<_> = h
        .arrivals(Header::PathErr)
        .into_iter()
        .filter(|(to, from, m)| {
            *to == NodeId(A)
                && *from == Some(NodeId(B))
                && m.error == Some(ErrorCode::LspFailure)
                && m.remove
        })
        .collect();
    assert_eq!(lsp.len(), 1);
    let tears: Vec<_> = h
        .arrivals(Header::PathTear)
        .into_iter()
        .filter(|(to, from, _)| *to == NodeId(D) && *from == Some(NodeId(C)))
        .collect();
    assert_eq!(tears.len(), 1);

    assert_eq!(h.available(A, B), 2);
    assert_eq!(h.available(C, D), 2);
    let b = h.control.router(NodeId(B)).expect("B alive");
    let c = h.control.router(NodeId(C)).expect("C alive");
    assert!(!b.links().contains(NodeId(C)));
    assert!(!c.links().contains(NodeId(B)));
    for r in h.control.routers() {
        assert!(r.active_connections().is_empty(), "{} holds a connection", r.id());
        assert!(r.has_seen_failure(1), "{} missed the flood", r.id());
    }
    h.control.verify_masks().expect("masks consistent");

    h.run();
    let stats = h.control.stats();
    assert_eq!(stats.link_failures, 1);
    // 请求只以 LSP_FAILURE 结束一次，下游段的拆除不算作移除
    assert_eq!(stats.removed, 0);
    assert!(
        !h.log
            .iter()
            .any(|e| matches!(e.kind, EventKind::LightpathRemoved { .. }))
    );
    assert_eq!(stats.failed_by_error.get("LSP_FAILURE"), Some(&1));
    assert_eq!(stats.suppressed_teardowns, 1);
}

#[test]
fn duplicate_failure_notice_is_a_noop() {
    let topo = build_ring(4, &template(2));
    let routes = KShortestPaths::build(&topo, 3);
    let cfg = ProtocolConfig::default();
    let ctx = RouterCtx {
        now: SimTime::from_millis(1),
        topology: &topo,
        routes: &routes,
        cfg: &cfg,
    };
    let mut router = Router::new(NodeId(B), &topo);
    let notice = FailureNotice {
        id: 7,
        a: NodeId(B),
        b: NodeId(C),
        detected_at: SimTime::ZERO,
    };

    let first = router
        .process(Packet::LinkFailure(notice.clone()), None, &ctx)
        .expect("first notice");
    assert_eq!(first.len(), 1, "flooded to the remaining neighbor only");
    match &first[0].kind {
        EventKind::PacketArrival { to, from, .. } => {
            assert_eq!(*to, NodeId(A));
            assert_eq!(*from, Some(NodeId(B)));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(!router.links().contains(NodeId(C)));
    let before = serde_json::to_value(&router).expect("serialize router");

    let second = router
        .process(Packet::LinkFailure(notice), Some(NodeId(A)), &ctx)
        .expect("second notice");
    assert!(second.is_empty());
    let after = serde_json::to_value(&router).expect("serialize router");
    assert_eq!(before, after);
}

#[test]
fn node_failure_restores_around_the_dead_node() {
    let mut h = Harness::new(build_ring(4, &template(2)), ProtocolConfig::default());
    h.request(SimTime::ZERO, A, C, 1.0);
    h.run_until(SimTime::from_millis(50));
    let first = h
        .control
        .router(NodeId(A))
        .and_then(|r| r.active_connections().values().next().cloned())
        .expect("established");
    assert_eq!(first.route, vec![NodeId(A), NodeId(B), NodeId(C)]);

    h.schedule(SimTime::from_millis(100), EventKind::FailureNode { node: NodeId(B) });
    h.run_until(SimTime::from_millis(300));

    assert!(h.control.router(NodeId(B)).is_none());
    assert!(h.control.is_disrupted(&first.flow_id));
    let restored = h
        .control
        .router(NodeId(A))
        .and_then(|r| r.active_connections().values().next().cloned())
        .expect("restored");
    assert_eq!(restored.route, vec![NodeId(A), NodeId(D), NodeId(C)]);
    assert_eq!(restored.flow_id, first.flow_id);
    assert!(restored.request.duration < 1.0);
    h.control.verify_masks().expect("masks consistent");

    // 发往已失效节点的拆除报文被丢弃并计数
    let stray = SignalingMessage::for_connection(Header::PathTear, &first);
    h.schedule(
        SimTime::from_millis(400),
        EventKind::PacketArrival {
            to: NodeId(B),
            from: Some(NodeId(A)),
            packet: Packet::Signaling(stray),
        },
    );

    h.run();
    let stats = h.control.stats();
    assert_eq!(stats.node_failures, 1);
    assert_eq!(stats.established, 2);
    assert_eq!(stats.restored, 1);
    assert_eq!(stats.restoration_attempts, 1);
    assert_eq!(stats.suppressed_teardowns, 1);
    assert_eq!(stats.removed, 1);
    assert_eq!(stats.dropped_at_failed_node, 1);
    assert_eq!(stats.failed, 0);
    assert!(!h.control.is_disrupted(&first.flow_id));
    for r in h.control.routers() {
        assert!(r.active_connections().is_empty());
        for (_, link) in r.links().iter() {
            assert_eq!(link.mask.count_available(), 2);
        }
    }
}

#[test]
fn direct_hop_failure_restores_the_long_way_round() {
    let mut h = Harness::new(build_ring(4, &template(1)), ProtocolConfig::default());
    h.request(SimTime::ZERO, A, B, 1.0);
    h.run_until(SimTime::from_millis(50));

    // A-B 断开后恢复走 A-D-C-B
    h.schedule(
        SimTime::from_millis(100),
        EventKind::FailureLink {
            a: NodeId(A),
            b: NodeId(B),
        },
    );
    h.run();
    let stats = h.control.stats();
    assert_eq!(stats.established, 2);
    assert_eq!(stats.restored, 1);
    assert_eq!(stats.failed, 0);
    for r in h.control.routers() {
        assert!(r.active_connections().is_empty());
        for (_, link) in r.links().iter() {
            assert_eq!(link.mask.count_available(), 1);
        }
    }
}

/// A 经 N 或 X 到达 C，首选路径经过 N
fn diamond() -> Harness {
    Harness::new(
        mesh(4, &[(A, B), (B, C), (A, D), (D, C)], 2),
        ProtocolConfig::default(),
    )
}

fn run_checked(h: &mut Harness) {
    while h.step() {
        h.control.verify_masks().expect("masks consistent after every event");
    }
}

#[test]
fn resv_reaching_source_after_node_failure_is_retried() {
    let mut h = diamond();
    h.request(SimTime::ZERO, A, C, 1.0);
    // RESV 在 1.5 ms 离开 N，2.0 ms 到达 A；N 在两者之间失效
    h.schedule(SimTime::from_micros(1_600), EventKind::FailureNode { node: NodeId(B) });
    h.run_until(SimTime::from_millis(100));

    let stats = h.control.stats();
    assert_eq!(stats.requests, 1);
    assert_eq!(stats.established, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.end_to_end_retries, 1);
    let conn = h
        .control
        .router(NodeId(A))
        .and_then(|r| r.active_connections().values().next().cloned())
        .expect("established around the dead node");
    assert_eq!(conn.route, vec![NodeId(A), NodeId(D), NodeId(C)]);
    for r in h.control.routers() {
        assert!(!r.has_crankback_state(&conn.flow_id), "{} kept crankback state", r.id());
    }
    h.control.verify_masks().expect("masks consistent");

    run_checked(&mut h);
    let stats = h.control.stats();
    assert_eq!(stats.removed, 1);
    assert_eq!(stats.dropped_at_failed_node, 0);
}

#[test]
fn resv_sent_into_a_dead_node_unwinds_and_retries() {
    let mut h = diamond();
    h.request(SimTime::ZERO, A, C, 1.0);
    // C 的 RESV 在 1.5 ms 到达 N 时 N 已失效
    h.schedule(SimTime::from_micros(1_500), EventKind::FailureNode { node: NodeId(B) });
    h.run_until(SimTime::from_millis(100));

    // RESV 被退回给 C，C 释放后发出的 PATH_ERR 同样落在 N 上
    let bounced: Vec<_> = h
        .arrivals(Header::ResvErr)
        .into_iter()
        .map(|(to, from, m)| (to, from, m.error))
        .collect();
    assert_eq!(
        bounced,
        vec![(NodeId(C), Some(NodeId(B)), Some(ErrorCode::NoRouteAvailable))]
    );

    let stats = h.control.stats();
    assert_eq!(stats.requests, 1);
    assert_eq!(stats.established, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.end_to_end_retries, 1);
    assert_eq!(stats.dropped_at_failed_node, 2);
    for r in h.control.routers() {
        assert!(r.active_connections().values().all(|c| c.route == vec![NodeId(A), NodeId(D), NodeId(C)]));
    }

    run_checked(&mut h);
    let stats = h.control.stats();
    assert_eq!(stats.removed, 1);
    for r in h.control.routers() {
        assert!(r.active_connections().is_empty());
        assert!(!r.has_any_crankback_state());
    }
}
