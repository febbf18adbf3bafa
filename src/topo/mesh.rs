//! 显式边表拓扑

use crate::error::ScenarioError;
use crate::net::{NodeId, Topology};
use serde::{Deserialize, Serialize};

use super::LinkTemplate;

/// 一条双向链路
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshLink {
    pub a: usize,
    pub b: usize,
    #[serde(default)]
    pub length_km: Option<f64>,
}

/// 按节点名列表与边表构建拓扑；节点 id 即名字在列表中的下标
pub fn build_mesh(
    names: &[String],
    links: &[MeshLink],
    link: &LinkTemplate,
) -> Result<Topology, ScenarioError> {
    let mut topo = Topology::new();
    let nodes: Vec<NodeId> = names.iter().map(|n| topo.add_node(n.clone())).collect();
    for l in links {
        if l.a >= nodes.len() || l.b >= nodes.len() {
            return Err(ScenarioError::Topology(format!(
                "link {}-{} references a node outside 0..{}",
                l.a,
                l.b,
                nodes.len()
            )));
        }
        if l.a == l.b {
            return Err(ScenarioError::Topology(format!("self loop at node {}", l.a)));
        }
        topo.connect_bidir(nodes[l.a], nodes[l.b], link.attrs(l.length_km));
    }
    Ok(topo)
}
