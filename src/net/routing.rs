//! 路由：下一跳选择接口与固定 k 最短路表
//!
//! 信令协议是逐跳的：每个节点在 PATH 到达时向 [`RouteProvider`] 询问下一跳，
//! 询问时带上尝试次数与该 flow 在本节点的 tabu 集合（已失败的邻居）。
//! 选路策略可以替换（固定 KSP 表、信息素自适应、域间策略……），
//! 协议状态机只依赖这个 trait。
//!
//! [`KShortestPaths`] 为每个 (from, dst) 预计算最多 k 条无环最短路（按跳数，
//! Yen 算法），拓扑变化后通过 `rebuild` 重新计算。

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt::Debug;

use super::id::{FlowId, NodeId};
use super::topology::Topology;
use tracing::{debug, trace};

/// 一条路径（节点序列，含首尾）
pub type Path = Vec<NodeId>;

/// 下一跳查询
#[derive(Debug, Clone, Copy)]
pub struct RouteQuery<'a> {
    pub flow_id: &'a FlowId,
    /// 当前节点
    pub at: NodeId,
    /// 请求源节点
    pub source: NodeId,
    pub target: NodeId,
    /// 请求的当前尝试次数（端到端重试时递增）
    pub attempt: u32,
    /// 本节点上该 flow 已失败的邻居
    pub tabu: &'a BTreeSet<NodeId>,
    /// 已记录的路径（不允许回到这些节点）
    pub visited: &'a [NodeId],
}

/// 下一跳选择器
pub trait RouteProvider: Debug {
    /// 返回下一跳；`None` 表示没有可用路由。
    fn next_hop(&self, query: &RouteQuery<'_>) -> Option<NodeId>;

    /// 拓扑变化后重新计算候选路由。
    fn rebuild(&mut self, topology: &Topology);
}

/// 固定 k 最短路表
#[derive(Debug, Default, Clone)]
pub struct KShortestPaths {
    k: usize,
    /// (from, dst) -> 按跳数升序的候选路径
    paths: HashMap<(NodeId, NodeId), Vec<Path>>,
}

impl KShortestPaths {
    pub fn build(topology: &Topology, k: usize) -> Self {
        let mut t = Self {
            k: k.max(1),
            paths: HashMap::new(),
        };
        t.rebuild(topology);
        t
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// 获取 (from, dst) 的候选路径
    pub fn candidates(&self, from: NodeId, dst: NodeId) -> &[Path] {
        self.paths
            .get(&(from, dst))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

impl RouteProvider for KShortestPaths {
    fn next_hop(&self, q: &RouteQuery<'_>) -> Option<NodeId> {
        let cands = self.candidates(q.at, q.target);
        if cands.is_empty() {
            return None;
        }
        // 只有源节点按尝试次数轮转起点；中间节点总是从最短的候选开始。
        let offset = if q.at == q.source {
            q.attempt as usize % cands.len()
        } else {
            0
        };
        let n = cands.len();
        let rotated = move || (0..n).map(move |i| &cands[(offset + i) % n]);
        let usable = |p: &Path| {
            let nh = p[1];
            !q.tabu.contains(&nh) && !q.visited.contains(&nh)
        };

        // 先找整条剩余路径都不与已走过节点相交的候选，找不到再只看下一跳。
        let strict = rotated()
            .find(|p| usable(*p) && p[1..].iter().all(|n| !q.visited.contains(n)))
            .map(|p| p[1]);
        let nh = strict.or_else(|| rotated().find(|p| usable(*p)).map(|p| p[1]));
        trace!(flow = %q.flow_id, at = %q.at, target = %q.target, attempt = q.attempt, next = ?nh, "KSP 选择下一跳");
        nh
    }

    fn rebuild(&mut self, topology: &Topology) {
        self.paths.clear();
        let nodes: Vec<NodeId> = topology.nodes().collect();
        for &from in &nodes {
            for &dst in &nodes {
                if from == dst {
                    continue;
                }
                let ps = k_shortest_paths(topology, from, dst, self.k);
                if !ps.is_empty() {
                    self.paths.insert((from, dst), ps);
                }
            }
        }
        debug!(pairs = self.paths.len(), k = self.k, "KSP 路由表已重建");
    }
}

/// BFS 求跳数最短路，跳过 `banned_nodes` 与 `banned_edges`。邻居按 id 升序访问，结果确定。
fn shortest_path(
    topology: &Topology,
    src: NodeId,
    dst: NodeId,
    banned_nodes: &BTreeSet<NodeId>,
    banned_edges: &BTreeSet<(NodeId, NodeId)>,
) -> Option<Path> {
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut q = VecDeque::from([src]);
    let mut seen = BTreeSet::from([src]);
    while let Some(v) = q.pop_front() {
        if v == dst {
            let mut path = vec![dst];
            let mut cur = dst;
            while let Some(&p) = parent.get(&cur) {
                path.push(p);
                cur = p;
            }
            path.reverse();
            return Some(path);
        }
        for nb in topology.neighbors(v) {
            if seen.contains(&nb) || banned_nodes.contains(&nb) || banned_edges.contains(&(v, nb)) {
                continue;
            }
            seen.insert(nb);
            parent.insert(nb, v);
            q.push_back(nb);
        }
    }
    None
}

/// Yen 算法：最多 k 条无环最短路，按 (跳数, 字典序) 排序。
pub fn k_shortest_paths(topology: &Topology, src: NodeId, dst: NodeId, k: usize) -> Vec<Path> {
    let Some(first) = shortest_path(topology, src, dst, &BTreeSet::new(), &BTreeSet::new()) else {
        return Vec::new();
    };
    let mut accepted: Vec<Path> = vec![first];
    let mut pending: Vec<Path> = Vec::new();

    while accepted.len() < k {
        let prev = accepted[accepted.len() - 1].clone();
        for j in 0..prev.len() - 1 {
            let spur = prev[j];
            let root = &prev[..=j];

            let banned_edges: BTreeSet<(NodeId, NodeId)> = accepted
                .iter()
                .filter(|p| p.len() > j + 1 && &p[..=j] == root)
                .map(|p| (p[j], p[j + 1]))
                .collect();
            let banned_nodes: BTreeSet<NodeId> = root[..j].iter().copied().collect();

            if let Some(spur_path) = shortest_path(topology, spur, dst, &banned_nodes, &banned_edges)
            {
                let mut total: Path = root[..j].to_vec();
                total.extend(spur_path);
                if !accepted.contains(&total) && !pending.contains(&total) {
                    pending.push(total);
                }
            }
        }
        if pending.is_empty() {
            break;
        }
        pending.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        accepted.push(pending.remove(0));
    }
    accepted
}
