//! 流量生成器
//!
//! 生成器产生 `(SimTime, LightpathRequest)`。随机生成器不保存 RNG 本身，
//! 只保存种子与抽样计数：每次抽样用 `(seed, draw)` 重新播种一个 `StdRng`，
//! 因此生成器状态可以原样写进快照，恢复后的抽样序列与不中断时完全一致。

use std::collections::VecDeque;

use crate::error::ScenarioError;
use crate::net::NodeId;
use crate::proto::LightpathRequest;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::time::SimTime;

const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;

/// splitmix64
fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(GOLDEN);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// 按逆变换采样指数分布
fn exponential(rng: &mut StdRng, mean: f64) -> f64 {
    let u: f64 = rng.random();
    -(1.0 - u).ln() * mean
}

/// 泊松到达 + 指数保持时间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoissonTraffic {
    /// 每秒到达的请求数
    pub arrival_rate: f64,
    pub mean_holding_s: f64,
    /// 请求总数上限；None 表示不限
    pub requests: Option<u64>,
    pub seed: u64,
    /// 候选端点（源/目的在其中均匀抽取）
    pub nodes: Vec<NodeId>,
    /// 固定端点对；非空时只在这些对里均匀抽取
    pub pairs: Vec<(NodeId, NodeId)>,
    pub max_tries: u32,
    draws: u64,
    emitted: u64,
}

impl PoissonTraffic {
    pub fn new(
        arrival_rate: f64,
        mean_holding_s: f64,
        requests: Option<u64>,
        seed: u64,
        nodes: Vec<NodeId>,
        pairs: Vec<(NodeId, NodeId)>,
        max_tries: u32,
    ) -> Result<Self, ScenarioError> {
        if !arrival_rate.is_finite() || arrival_rate <= 0.0 {
            return Err(ScenarioError::Traffic(format!(
                "arrival_rate must be positive, got {arrival_rate}"
            )));
        }
        if !mean_holding_s.is_finite() || mean_holding_s <= 0.0 {
            return Err(ScenarioError::Traffic(format!(
                "mean_holding_s must be positive, got {mean_holding_s}"
            )));
        }
        if pairs.is_empty() && nodes.len() < 2 {
            return Err(ScenarioError::Traffic(
                "poisson traffic needs at least two nodes or an explicit pair list".into(),
            ));
        }
        if let Some((s, _)) = pairs.iter().find(|(s, t)| s == t) {
            return Err(ScenarioError::Traffic(format!(
                "pair {s}->{s} has identical endpoints"
            )));
        }
        Ok(Self {
            arrival_rate,
            mean_holding_s,
            requests,
            seed,
            nodes,
            pairs,
            max_tries,
            draws: 0,
            emitted: 0,
        })
    }

    /// 第 `draws` 次抽样专用的 RNG
    fn rng(&mut self) -> StdRng {
        let rng = StdRng::seed_from_u64(mix64(self.seed ^ self.draws.wrapping_mul(GOLDEN)));
        self.draws += 1;
        rng
    }

    fn interarrival(&mut self) -> SimTime {
        let mut rng = self.rng();
        SimTime::from_secs_f64(exponential(&mut rng, 1.0 / self.arrival_rate))
    }

    fn exhausted(&self) -> bool {
        self.requests.is_some_and(|limit| self.emitted >= limit)
    }

    fn draw_request(&mut self) -> LightpathRequest {
        let mut rng = self.rng();
        let (source, target) = if self.pairs.is_empty() {
            let n = self.nodes.len();
            let s = rng.random_range(0..n);
            let mut t = rng.random_range(0..n - 1);
            if t >= s {
                t += 1;
            }
            (self.nodes[s], self.nodes[t])
        } else {
            self.pairs[rng.random_range(0..self.pairs.len())]
        };
        let duration = exponential(&mut rng, self.mean_holding_s);
        LightpathRequest::new(source, target, duration, self.max_tries)
    }
}

/// 按时间回放的脚本请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedRequest {
    pub at: SimTime,
    pub request: LightpathRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedTraffic {
    pending: VecDeque<ScriptedRequest>,
}

impl ScriptedTraffic {
    /// 按时间排序（同一时刻保持给定顺序）
    pub fn new(mut items: Vec<ScriptedRequest>) -> Self {
        items.sort_by_key(|r| r.at);
        Self {
            pending: items.into(),
        }
    }
}

/// 流量模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum TrafficModel {
    Poisson(PoissonTraffic),
    Scripted(ScriptedTraffic),
}

impl TrafficModel {
    /// 注册时计算第一次触发时间；None 表示一开始就没有请求
    pub fn first_fire(&mut self, start: SimTime) -> Option<SimTime> {
        match self {
            TrafficModel::Poisson(p) => {
                if p.exhausted() {
                    return None;
                }
                Some(start.saturating_add(p.interarrival()))
            }
            TrafficModel::Scripted(s) => s.pending.front().map(|r| r.at.max(start)),
        }
    }

    /// 在 `at` 触发：返回这次的请求与下一次触发时间（None 表示退休）
    pub fn fire(&mut self, at: SimTime) -> Option<(LightpathRequest, Option<SimTime>)> {
        match self {
            TrafficModel::Poisson(p) => {
                let request = p.draw_request();
                p.emitted += 1;
                let next = if p.exhausted() {
                    None
                } else {
                    Some(at.saturating_add(p.interarrival()))
                };
                trace!(emitted = p.emitted, draws = p.draws, next = ?next, "泊松生成器触发");
                Some((request, next))
            }
            TrafficModel::Scripted(s) => {
                let item = s.pending.pop_front()?;
                let next = s.pending.front().map(|r| r.at.max(at));
                Some((item.request, next))
            }
        }
    }
}
