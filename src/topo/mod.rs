//! 拓扑预设
//!
//! 环形、NSFNET 骨干网与显式边表三种构建方式，链路属性来自同一个模板。

mod mesh;
mod nsfnet;
mod ring;

pub use mesh::{MeshLink, build_mesh};
pub use nsfnet::{NSFNET_LINKS, NSFNET_NODES, build_nsfnet};
pub use ring::build_ring;

use crate::net::LinkAttrs;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};

/// 链路属性模板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTemplate {
    pub wavelengths: u32,
    pub data_rate_gbps: f64,
    pub length_km: f64,
    /// 固定传播时延；None 时按长度推算
    pub delay: Option<SimTime>,
}

impl Default for LinkTemplate {
    fn default() -> Self {
        Self {
            wavelengths: 8,
            data_rate_gbps: 10.0,
            length_km: 100.0,
            delay: None,
        }
    }
}

impl LinkTemplate {
    /// 生成链路属性；`length_km` 覆盖模板中的长度
    pub fn attrs(&self, length_km: Option<f64>) -> LinkAttrs {
        let mut attrs = LinkAttrs::with_length(
            self.wavelengths,
            self.data_rate_gbps,
            length_km.unwrap_or(self.length_km),
        );
        if let Some(d) = self.delay {
            attrs.delay = d;
        }
        attrs
    }
}
