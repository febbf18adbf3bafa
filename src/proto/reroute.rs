//! 协议参数：重路由策略、波长分配策略与重试预算

use crate::sim::SimTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// 重路由策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum RerouteStrategy {
    /// 不重试：第一次失败即终态（拓扑故障也不恢复）
    None,
    /// 失败回到源端，由控制面整体重试
    #[default]
    #[value(alias = "e2e")]
    EndToEnd,
    /// crankback：沿记录路径回溯，在上游节点就地尝试其它邻居
    #[value(alias = "crankback")]
    Segment,
}

/// 波长分配策略：只影响首跳候选集合的优先顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum WavelengthPolicy {
    #[default]
    FirstFit,
    /// 优先选择全网使用最多的波长
    MostUsed,
    /// 优先选择全网使用最少的波长
    LeastUsed,
}

impl WavelengthPolicy {
    /// 根据每个波长的全网占用数给出优先顺序；相同占用按下标升序。
    pub fn order(self, usage: &[u32]) -> Vec<u32> {
        let mut order: Vec<u32> = (0..usage.len() as u32).collect();
        match self {
            WavelengthPolicy::FirstFit => {}
            WavelengthPolicy::MostUsed => {
                order.sort_by(|&a, &b| usage[b as usize].cmp(&usage[a as usize]).then(a.cmp(&b)))
            }
            WavelengthPolicy::LeastUsed => {
                order.sort_by(|&a, &b| usage[a as usize].cmp(&usage[b as usize]).then(a.cmp(&b)))
            }
        }
        order
    }
}

/// 协议配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub reroute: RerouteStrategy,
    pub wavelength_policy: WavelengthPolicy,
    /// 单个节点上 crankback 的次数上限（tabu 集合大小上限）
    pub local_attempts: u32,
    /// 一个请求生命周期内的尝试总数上限
    pub global_attempts: u32,
    /// 控制面端到端重试上限
    pub max_tries: u32,
    /// PATH 的跳数预算
    pub max_hops: u32,
    /// KSP 候选路径数
    pub k_paths: usize,
    /// 故障发生到相邻节点感知的时延
    pub localization_delay: SimTime,
    /// 链路表里没有对应邻居时（链路已失效）信令走带外控制信道的时延
    pub control_delay: SimTime,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            reroute: RerouteStrategy::default(),
            wavelength_policy: WavelengthPolicy::default(),
            local_attempts: 2,
            global_attempts: 6,
            max_tries: 3,
            max_hops: 16,
            k_paths: 3,
            localization_delay: SimTime::from_millis(1),
            control_delay: SimTime::from_micros(100),
        }
    }
}
