//! NSFNET T1 骨干网（14 节点、21 条链路）

use crate::net::{NodeId, Topology};

use super::LinkTemplate;

pub const NSFNET_NODES: [&str; 14] = [
    "WA", "CA1", "CA2", "UT", "CO", "TX", "NE", "IL", "PA", "GA", "MI", "NY", "NJ", "MD",
];

/// (a, b, 长度 km)
pub const NSFNET_LINKS: [(usize, usize, f64); 21] = [
    (0, 1, 2100.0),
    (0, 2, 3000.0),
    (0, 7, 4800.0),
    (1, 2, 1200.0),
    (1, 3, 1500.0),
    (2, 5, 3600.0),
    (3, 4, 1200.0),
    (3, 10, 3900.0),
    (4, 5, 2400.0),
    (4, 6, 1200.0),
    (5, 9, 2100.0),
    (5, 13, 3600.0),
    (6, 7, 1500.0),
    (7, 8, 1500.0),
    (8, 9, 1500.0),
    (8, 11, 600.0),
    (8, 12, 600.0),
    (10, 11, 1200.0),
    (10, 12, 1500.0),
    (11, 13, 600.0),
    (12, 13, 300.0),
];

/// 构建 NSFNET；链路长度取自上表，其余属性取自模板
pub fn build_nsfnet(link: &LinkTemplate) -> Topology {
    let mut topo = Topology::new();
    let nodes: Vec<NodeId> = NSFNET_NODES.iter().map(|n| topo.add_node(*n)).collect();
    for &(a, b, km) in &NSFNET_LINKS {
        topo.connect_bidir(nodes[a], nodes[b], link.attrs(Some(km)));
    }
    topo
}
