//! 链路类型
//!
//! 定义光纤链路的静态属性，以及每个节点本地的链路资源表
//! （邻居 → 静态属性 + 实时波长掩码）。

use std::collections::BTreeMap;

use super::id::NodeId;
use super::mask::ResourceMask;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};

/// 光纤每公里传播时延（约 5 微秒）
pub const FIBER_DELAY_NS_PER_KM: u64 = 5_000;

/// 链路静态属性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkAttrs {
    /// 波长数
    pub wavelengths: u32,
    pub data_rate_gbps: f64,
    pub length_km: f64,
    /// 单向传播时延
    pub delay: SimTime,
}

impl LinkAttrs {
    /// 按长度推算传播时延
    pub fn with_length(wavelengths: u32, data_rate_gbps: f64, length_km: f64) -> Self {
        let delay_ns = (length_km.max(0.0) * FIBER_DELAY_NS_PER_KM as f64).round() as u64;
        Self {
            wavelengths,
            data_rate_gbps,
            length_km,
            delay: SimTime(delay_ns),
        }
    }
}

/// 链路资源表项：静态属性 + 实时波长掩码
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkState {
    pub attrs: LinkAttrs,
    pub mask: ResourceMask,
}

impl LinkState {
    pub fn new(attrs: LinkAttrs) -> Self {
        let mask = ResourceMask::full(attrs.wavelengths);
        Self { attrs, mask }
    }

    /// 已占用波长数
    pub fn used(&self) -> u32 {
        self.mask.len() - self.mask.count_available()
    }
}

/// 节点本地的链路资源表，以下游邻居为键（表项描述 `self -> neighbor` 方向）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkTable {
    entries: BTreeMap<NodeId, LinkState>,
}

impl LinkTable {
    pub fn insert(&mut self, neighbor: NodeId, attrs: LinkAttrs) {
        self.entries.insert(neighbor, LinkState::new(attrs));
    }

    pub fn remove(&mut self, neighbor: NodeId) -> Option<LinkState> {
        self.entries.remove(&neighbor)
    }

    pub fn get(&self, neighbor: NodeId) -> Option<&LinkState> {
        self.entries.get(&neighbor)
    }

    pub fn get_mut(&mut self, neighbor: NodeId) -> Option<&mut LinkState> {
        self.entries.get_mut(&neighbor)
    }

    pub fn contains(&self, neighbor: NodeId) -> bool {
        self.entries.contains_key(&neighbor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &LinkState)> + '_ {
        self.entries.iter().map(|(n, s)| (*n, s))
    }
}
