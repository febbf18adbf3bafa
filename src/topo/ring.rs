//! 环形拓扑构建

use crate::net::{NodeId, Topology};

use super::LinkTemplate;

/// 构建 n 节点双向环：r0 <-> r1 <-> ... <-> r(n-1) <-> r0
///
/// n = 2 时只有一条链路；n < 2 时没有链路。
pub fn build_ring(n: usize, link: &LinkTemplate) -> Topology {
    let mut topo = Topology::new();
    let nodes: Vec<NodeId> = (0..n).map(|i| topo.add_node(format!("r{i}"))).collect();
    if n < 2 {
        return topo;
    }
    let pairs = if n == 2 { 1 } else { n };
    for i in 0..pairs {
        topo.connect_bidir(nodes[i], nodes[(i + 1) % n], link.attrs(None));
    }
    topo
}
