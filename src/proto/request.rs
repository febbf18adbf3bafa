//! Lightpath 请求与已建立的连接

use crate::net::{FlowId, NodeId, Path};
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};

/// Lightpath 请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightpathRequest {
    pub source: NodeId,
    pub target: NodeId,
    /// 保持时间（秒）。恢复时就地缩短为剩余保持时间。
    pub duration: f64,
    pub current_try: u32,
    pub max_tries: u32,
    pub lifetime_tries: u32,
}

impl LightpathRequest {
    pub fn new(source: NodeId, target: NodeId, duration: f64, max_tries: u32) -> Self {
        Self {
            source,
            target,
            duration,
            current_try: 0,
            max_tries,
            lifetime_tries: 0,
        }
    }

    pub fn add_try(&mut self) {
        self.current_try = self.current_try.saturating_add(1);
        self.lifetime_tries = self.lifetime_tries.saturating_add(1);
    }

    /// 新一轮尝试（例如故障后的恢复）；生命周期计数保留。
    pub fn reset_try(&mut self) {
        self.current_try = 0;
    }

    pub fn holding_time(&self) -> SimTime {
        SimTime::from_secs_f64(self.duration)
    }
}

/// 已建立（或正在预留）的 lightpath 连接
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub route: Path,
    pub wavelength: u32,
    pub flow_id: FlowId,
    pub request: LightpathRequest,
    pub start_time: SimTime,
}

impl Connection {
    pub fn source(&self) -> NodeId {
        self.route[0]
    }

    pub fn target(&self) -> NodeId {
        self.route[self.route.len() - 1]
    }

    pub fn successor(&self, n: NodeId) -> Option<NodeId> {
        successor(&self.route, n)
    }

    pub fn predecessor(&self, n: NodeId) -> Option<NodeId> {
        predecessor(&self.route, n)
    }

    /// 路径是否按 `from -> to` 方向经过这条边
    pub fn traverses(&self, from: NodeId, to: NodeId) -> bool {
        self.route.windows(2).any(|w| w[0] == from && w[1] == to)
    }

    /// 同一个连接实例（同一 flow 的恢复连接会有不同的路径或开始时间）
    pub fn same_instance(&self, other: &Connection) -> bool {
        self.flow_id == other.flow_id
            && self.wavelength == other.wavelength
            && self.start_time == other.start_time
            && self.route == other.route
    }

    /// 已经保持的时间之后剩余的保持时间（秒）
    pub fn residual_duration(&self, now: SimTime) -> f64 {
        let held = now.saturating_sub(self.start_time).as_secs_f64();
        self.request.duration - held
    }
}

/// 路径中 `n` 的下一个节点
pub fn successor(route: &[NodeId], n: NodeId) -> Option<NodeId> {
    let pos = route.iter().position(|&x| x == n)?;
    route.get(pos + 1).copied()
}

/// 路径中 `n` 的上一个节点
pub fn predecessor(route: &[NodeId], n: NodeId) -> Option<NodeId> {
    let pos = route.iter().position(|&x| x == n)?;
    pos.checked_sub(1).map(|p| route[p])
}
