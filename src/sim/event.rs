//! 事件类型
//!
//! 所有仿真活动都是一个带触发时间的 [`Event`]。事件种类是封闭的枚举，
//! 整个事件队列因此可以序列化进快照。

use crate::net::NodeId;
use crate::proto::{Connection, LightpathRequest, Packet, SignalingMessage};
use serde::{Deserialize, Serialize};

use super::time::SimTime;

/// 事件种类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// 控制报文到达节点 `to`（`from` 为发送它的邻居；本地注入时为 None）
    PacketArrival {
        to: NodeId,
        from: Option<NodeId>,
        packet: Packet,
    },
    /// 流量生成器产生的新请求
    LightpathRequest { request: LightpathRequest },
    /// RESV 回到源端
    LightpathEstablished { msg: SignalingMessage },
    /// 失败到达源端
    LightpathProblem { msg: SignalingMessage },
    /// 保持时间到，开始拆除
    LightpathTeardown { connection: Connection },
    /// 拆除完成
    LightpathRemoved { msg: SignalingMessage },
    FailureLink { a: NodeId, b: NodeId },
    FailureNode { node: NodeId },
    /// 停止运行
    Terminate,
    /// 保存名为 `name` 的快照
    Serialize { name: String },
    /// 一组需要原子地重新插入的事件
    Multiple { events: Vec<Event> },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PacketArrival { .. } => "packet_arrival",
            EventKind::LightpathRequest { .. } => "lightpath_request",
            EventKind::LightpathEstablished { .. } => "lightpath_established",
            EventKind::LightpathProblem { .. } => "lightpath_problem",
            EventKind::LightpathTeardown { .. } => "lightpath_teardown",
            EventKind::LightpathRemoved { .. } => "lightpath_removed",
            EventKind::FailureLink { .. } => "failure_link",
            EventKind::FailureNode { .. } => "failure_node",
            EventKind::Terminate => "terminate",
            EventKind::Serialize { .. } => "serialize",
            EventKind::Multiple { .. } => "multiple",
        }
    }
}

/// 仿真事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub fire_time: SimTime,
    pub created_time: SimTime,
    pub kind: EventKind,
}

impl Event {
    pub fn new(fire_time: SimTime, created_time: SimTime, kind: EventKind) -> Self {
        Self {
            fire_time,
            created_time,
            kind,
        }
    }

    /// 立即触发的事件
    pub fn now(now: SimTime, kind: EventKind) -> Self {
        Self::new(now, now, kind)
    }

    /// 报文沿链路传播 `delay` 后到达
    pub fn arrival(
        now: SimTime,
        delay: SimTime,
        to: NodeId,
        from: Option<NodeId>,
        packet: Packet,
    ) -> Self {
        Self::new(
            now.saturating_add(delay),
            now,
            EventKind::PacketArrival { to, from, packet },
        )
    }

    /// 把零个/一个/多个后续事件折叠为 `Option<Event>`
    pub fn bundle(now: SimTime, mut events: Vec<Event>) -> Option<Event> {
        match events.len() {
            0 => None,
            1 => events.pop(),
            _ => Some(Event::now(now, EventKind::Multiple { events })),
        }
    }
}
