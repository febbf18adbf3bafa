//! 网络拓扑管理
//!
//! 可变的节点/边图。链路在光网络里成对出现（两根方向相反的光纤），
//! 故障以无向链路为单位移除；邻接查询按节点 id 有序，保证泛洪与路由计算可复现。

use std::collections::BTreeMap;

use super::id::NodeId;
use super::link::LinkAttrs;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// 网络拓扑
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    names: BTreeMap<NodeId, String>,
    adj: BTreeMap<NodeId, BTreeMap<NodeId, LinkAttrs>>,
    next_node: usize,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加节点
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.names.insert(id, name.into());
        self.adj.insert(id, BTreeMap::new());
        id
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(&mut self, from: NodeId, to: NodeId, attrs: LinkAttrs) {
        debug_assert!(from != to, "self loop at {from}");
        if let Some(out) = self.adj.get_mut(&from) {
            out.insert(to, attrs);
        }
    }

    /// 连接两个节点（双向，两个方向属性相同）
    pub fn connect_bidir(&mut self, a: NodeId, b: NodeId, attrs: LinkAttrs) {
        self.connect(a, b, attrs.clone());
        self.connect(b, a, attrs);
    }

    pub fn contains_node(&self, n: NodeId) -> bool {
        self.adj.contains_key(&n)
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.adj.get(&from).is_some_and(|out| out.contains_key(&to))
    }

    pub fn link(&self, from: NodeId, to: NodeId) -> Option<&LinkAttrs> {
        self.adj.get(&from)?.get(&to)
    }

    pub fn name(&self, n: NodeId) -> Option<&str> {
        self.names.get(&n).map(String::as_str)
    }

    /// 节点的出边邻居（升序）
    pub fn neighbors(&self, n: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adj
            .get(&n)
            .into_iter()
            .flat_map(|out| out.keys().copied())
    }

    /// 节点的出边（邻居与链路属性）
    pub fn links_from(&self, n: NodeId) -> impl Iterator<Item = (NodeId, &LinkAttrs)> + '_ {
        self.adj
            .get(&n)
            .into_iter()
            .flat_map(|out| out.iter().map(|(k, v)| (*k, v)))
    }

    pub fn degree(&self, n: NodeId) -> usize {
        self.adj.get(&n).map_or(0, BTreeMap::len)
    }

    /// 所有存活节点（升序）
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adj.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// 单向边数量
    pub fn edge_count(&self) -> usize {
        self.adj.values().map(BTreeMap::len).sum()
    }

    /// 移除无向链路（两个方向）。链路不存在时返回 false。
    pub fn remove_link(&mut self, a: NodeId, b: NodeId) -> bool {
        let ab = self.adj.get_mut(&a).and_then(|out| out.remove(&b)).is_some();
        let ba = self.adj.get_mut(&b).and_then(|out| out.remove(&a)).is_some();
        debug!(a = %a, b = %b, removed = ab || ba, "移除链路");
        ab || ba
    }

    /// 移除节点及其全部链路，返回原来的邻居。
    pub fn remove_node(&mut self, n: NodeId) -> Vec<NodeId> {
        let Some(out) = self.adj.remove(&n) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeId> = out.into_keys().collect();
        for (&other, edges) in self.adj.iter_mut() {
            if edges.remove(&n).is_some() && !neighbors.contains(&other) {
                neighbors.push(other);
            }
        }
        neighbors.sort();
        debug!(node = %n, neighbors = ?neighbors, "移除节点");
        neighbors
    }

    /// 级联移除失去所有链路的节点，返回被移除的节点。
    pub fn remove_isolated(&mut self) -> Vec<NodeId> {
        let isolated: Vec<NodeId> = self
            .adj
            .iter()
            .filter(|(n, out)| out.is_empty() && !self.has_incoming(**n))
            .map(|(n, _)| *n)
            .collect();
        for n in &isolated {
            trace!(node = %n, "级联移除孤立节点");
            self.adj.remove(n);
        }
        isolated
    }

    fn has_incoming(&self, n: NodeId) -> bool {
        self.adj.values().any(|out| out.contains_key(&n))
    }
}
