//! 错误类型
//!
//! 协议层的结果（波长不可用、无路由、准入失败等）是消息里的 [`ErrorCode`]，
//! 不是 Rust 错误；这里只定义会终止仿真的致命错误，以及配置/IO 层的错误。
//!
//! [`ErrorCode`]: crate::proto::ErrorCode

use crate::net::{FlowId, NodeId};
use thiserror::Error;

/// 资源掩码操作错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    /// 波长下标超出该链路的波长数
    #[error("wavelength {index} out of range (link carries {len})")]
    OutOfRange { index: u32, len: u32 },
    /// 预留一个已被占用的波长（竞争失败）
    #[error("wavelength {0} is already in use")]
    AlreadyUsed(u32),
    /// 释放一个从未预留的波长
    #[error("wavelength {0} was never reserved")]
    NotReserved(u32),
    /// 两个掩码的波长数不一致
    #[error("mask width mismatch: {left} vs {right}")]
    WidthMismatch { left: u32, right: u32 },
}

/// 调度器错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("no traffic generator registered")]
    NoGenerators,
    /// 所有生成器已退休且事件队列为空
    #[error("scheduler drained: no pending events")]
    Drained,
}

/// 仿真致命错误
#[derive(Debug, Error)]
pub enum SimError {
    #[error("scheduler: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("unexpected {header} message at {node} for flow {flow}")]
    UnexpectedHeader {
        header: &'static str,
        node: NodeId,
        flow: FlowId,
    },
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("invariant violated at {node}: {reason}")]
    Invariant { node: NodeId, reason: String },
    #[error("resource mask at {node} toward {neighbor}: {source}")]
    Mask {
        node: NodeId,
        neighbor: NodeId,
        #[source]
        source: MaskError,
    },
    #[error("snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("unsupported snapshot schema_version {0}")]
    SnapshotVersion(u32),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// 场景文件错误
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("unsupported schema_version {0}")]
    SchemaVersion(u32),
    #[error("invalid topology: {0}")]
    Topology(String),
    #[error("invalid traffic: {0}")]
    Traffic(String),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
