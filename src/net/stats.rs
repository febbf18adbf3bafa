//! 统计信息
//!
//! 控制面在每个终态结果上调用 [`Accounting`]；`Stats` 是默认实现，
//! 只做计数，可序列化为 JSON 输出。

use std::collections::BTreeMap;

use crate::proto::{ErrorCode, SignalingMessage};
use serde::{Deserialize, Serialize};

/// 统计接收端
pub trait Accounting {
    /// 新的 lightpath 请求进入控制面
    fn add_request(&mut self);
    /// lightpath 建立成功（`msg.restoration` 标记恢复）
    fn add_successful(&mut self, msg: &SignalingMessage);
    /// 请求最终失败
    fn add_failed(&mut self, msg: &SignalingMessage);
    /// 连接被拆除完成
    fn add_removed(&mut self, msg: &SignalingMessage);
    /// 发往已失效节点的消息被丢弃
    fn add_dropped(&mut self);
}

/// 仿真统计信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub requests: u64,
    pub established: u64,
    pub restored: u64,
    pub failed: u64,
    pub failed_restorations: u64,
    /// 按错误码分类的失败数
    pub failed_by_error: BTreeMap<String, u64>,
    pub removed: u64,
    pub dropped_at_failed_node: u64,
    pub suppressed_teardowns: u64,
    pub end_to_end_retries: u64,
    pub restoration_attempts: u64,
    pub link_failures: u64,
    pub node_failures: u64,
    /// 各节点 crankback 次数之和（由控制面汇总）
    pub crankbacks: u64,
}

impl Stats {
    /// 阻塞率：失败的新请求占已结束新请求的比例
    pub fn blocking_probability(&self) -> f64 {
        let fresh_failed = self.failed.saturating_sub(self.failed_restorations);
        let fresh_ok = self.established.saturating_sub(self.restored);
        let done = fresh_failed + fresh_ok;
        if done == 0 {
            0.0
        } else {
            fresh_failed as f64 / done as f64
        }
    }
}

impl Accounting for Stats {
    fn add_request(&mut self) {
        self.requests += 1;
    }

    fn add_successful(&mut self, msg: &SignalingMessage) {
        self.established += 1;
        if msg.restoration {
            self.restored += 1;
        }
    }

    fn add_failed(&mut self, msg: &SignalingMessage) {
        self.failed += 1;
        if msg.restoration {
            self.failed_restorations += 1;
        }
        let key = msg.error.map_or(ErrorCode::NAME_NONE, ErrorCode::name);
        *self.failed_by_error.entry(key.to_string()).or_default() += 1;
    }

    fn add_removed(&mut self, _msg: &SignalingMessage) {
        self.removed += 1;
    }

    fn add_dropped(&mut self) {
        self.dropped_at_failed_node += 1;
    }
}
