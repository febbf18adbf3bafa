//! 信令消息
//!
//! RSVP-TE 风格的逐跳信令：PATH 沿途记录路径并与每条链路的波长掩码求交，
//! RESV 反向逐跳预留，PATH_ERR/RESV_ERR 负责回退，PATH_TEAR/RESV_TEAR 拆除。
//! 故障通告走单独的控制信道，用 [`Packet::LinkFailure`] 表示。

use crate::error::MaskError;
use crate::net::{FlowId, NodeId, Path, ResourceMask};
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};

use super::request::{Connection, LightpathRequest};

/// 消息头类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Header {
    /// 正向信令，建立路径
    Path,
    /// 反向报告失败（也是 crankback 的触发点）
    PathErr,
    /// 反向逐跳预留
    Resv,
    /// 正向回退已预留的跳
    ResvErr,
    /// 正向拆除
    PathTear,
    /// 反向拆除
    ResvTear,
}

impl Header {
    pub fn name(self) -> &'static str {
        match self {
            Header::Path => "PATH",
            Header::PathErr => "PATH_ERR",
            Header::Resv => "RESV",
            Header::ResvErr => "RESV_ERR",
            Header::PathTear => "PATH_TEAR",
            Header::ResvTear => "RESV_TEAR",
        }
    }
}

/// 协议层错误码（都是协议结果，不是进程错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// RP_LABEL_SET：候选波长集合为空（波长连续性约束）
    WavelengthUnavailable,
    /// RP_NO_ROUTE_AVAILABLE
    NoRouteAvailable,
    /// 预留竞争失败
    AdmissionControlFailure,
    /// 拓扑故障拆除了活动连接
    LspFailure,
    /// 重路由预算耗尽
    RerouteLimitExceeded,
}

impl ErrorCode {
    pub const NAME_NONE: &'static str = "NONE";

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::WavelengthUnavailable => "RP_LABEL_SET",
            ErrorCode::NoRouteAvailable => "RP_NO_ROUTE_AVAILABLE",
            ErrorCode::AdmissionControlFailure => "ADMISSION_CONTROL_FAILURE",
            ErrorCode::LspFailure => "LSP_FAILURE",
            ErrorCode::RerouteLimitExceeded => "RP_REROUTING_LIMIT_EXCEEDED",
        }
    }

    /// 可以在上游节点通过 crankback 就地恢复的错误
    pub fn is_crankback_eligible(self) -> bool {
        matches!(
            self,
            ErrorCode::WavelengthUnavailable | ErrorCode::NoRouteAvailable
        )
    }
}

/// 候选波长集合（Label Set）：可用性掩码 + 选择优先顺序。
///
/// 优先顺序只在源端按波长分配策略设置一次，之后每跳只做求交。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub mask: ResourceMask,
    pub order: Vec<u32>,
}

impl LabelSet {
    /// 满集合，first-fit 顺序
    pub fn full(wavelengths: u32) -> Self {
        Self {
            mask: ResourceMask::full(wavelengths),
            order: (0..wavelengths).collect(),
        }
    }

    pub fn with_order(wavelengths: u32, order: Vec<u32>) -> Self {
        debug_assert_eq!(order.len(), wavelengths as usize);
        Self {
            mask: ResourceMask::full(wavelengths),
            order,
        }
    }

    pub fn intersect(&mut self, link: &ResourceMask) -> Result<(), MaskError> {
        self.mask.intersect(link)
    }

    pub fn count_available(&self) -> u32 {
        self.mask.count_available()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// 按优先顺序选第一个可用波长
    pub fn first_available(&self) -> Option<u32> {
        self.order
            .iter()
            .copied()
            .find(|&w| self.mask.is_available(w))
    }
}

/// 信令消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingMessage {
    pub header: Header,
    pub flow_id: FlowId,
    /// 请求源节点
    pub source: NodeId,
    /// 请求目的节点
    pub target: NodeId,
    /// PATH 记录的路径（从源到当前最远节点）
    pub route: Path,
    /// 剩余跳数预算
    pub hop_limit: u32,
    pub request: LightpathRequest,
    /// 候选波长集合，仅 PATH 携带
    pub label_set: Option<LabelSet>,
    pub error: Option<ErrorCode>,
    /// LSP_FAILURE 时要求沿途删除连接状态
    pub remove: bool,
    /// 这是一次故障恢复尝试
    pub restoration: bool,
    /// RESV / RESV_ERR / PATH_TEAR / RESV_TEAR / LSP_FAILURE 携带的连接
    pub connection: Option<Connection>,
}

impl SignalingMessage {
    /// 源端发出的 PATH
    pub fn path(
        flow_id: FlowId,
        request: LightpathRequest,
        label_set: LabelSet,
        hop_limit: u32,
    ) -> Self {
        Self {
            header: Header::Path,
            flow_id,
            source: request.source,
            target: request.target,
            route: vec![request.source],
            hop_limit,
            request,
            label_set: Some(label_set),
            error: None,
            remove: false,
            restoration: false,
            connection: None,
        }
    }

    /// 沿连接发出的拆除/故障消息
    pub fn for_connection(header: Header, conn: &Connection) -> Self {
        Self {
            header,
            flow_id: conn.flow_id.clone(),
            source: conn.source(),
            target: conn.target(),
            route: conn.route.clone(),
            hop_limit: 0,
            request: conn.request.clone(),
            label_set: None,
            error: None,
            remove: false,
            restoration: false,
            connection: Some(conn.clone()),
        }
    }

    /// 翻转消息类型并设置错误码
    pub fn flip(mut self, header: Header, error: Option<ErrorCode>) -> Self {
        self.header = header;
        if error.is_some() {
            self.error = error;
        }
        self
    }
}

/// 链路故障通告（带外控制信道泛洪）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    /// 全局唯一的故障 id，节点据此去重
    pub id: u64,
    /// 故障链路的两个端点
    pub a: NodeId,
    pub b: NodeId,
    pub detected_at: SimTime,
}

impl FailureNotice {
    /// 另一个端点
    pub fn other(&self, n: NodeId) -> Option<NodeId> {
        if self.a == n {
            Some(self.b)
        } else if self.b == n {
            Some(self.a)
        } else {
            None
        }
    }
}

/// 节点之间交换的控制报文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Signaling(SignalingMessage),
    LinkFailure(FailureNotice),
}

impl Packet {
    /// 显式分叉：把一个报文复制成发往多个邻居的独立副本。
    pub fn fan_out<I>(&self, targets: I) -> Vec<(NodeId, Packet)>
    where
        I: IntoIterator<Item = NodeId>,
    {
        targets.into_iter().map(|t| (t, self.clone())).collect()
    }

    pub fn flow_id(&self) -> Option<&FlowId> {
        match self {
            Packet::Signaling(m) => Some(&m.flow_id),
            Packet::LinkFailure(_) => None,
        }
    }
}
