//! 标识符类型
//!
//! 定义节点与流（lightpath 请求）的唯一标识符。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 节点标识符
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// 流标识符：关联同一个 lightpath 请求/连接的所有信令消息。
///
/// 重试与恢复沿用同一个 flow id，因此节点上按 flow id 保存的临时状态
/// （tabu、暂存的候选波长集合）必须在终态时清理。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(pub String);

impl FlowId {
    pub fn new(seq: u64, source: NodeId, target: NodeId) -> Self {
        FlowId(format!("f{seq}:{source}->{target}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
