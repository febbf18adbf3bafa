//! 光网络模型模块
//!
//! 此模块包含拓扑、链路资源表、波长掩码、选路接口与统计。

// 子模块声明
mod id;
mod link;
mod mask;
mod routing;
mod stats;
mod topology;

// 重新导出公共接口
pub use id::{FlowId, NodeId};
pub use link::{FIBER_DELAY_NS_PER_KM, LinkAttrs, LinkState, LinkTable};
pub use mask::ResourceMask;
pub use routing::{KShortestPaths, Path, RouteProvider, RouteQuery, k_shortest_paths};
pub use stats::{Accounting, Stats};
pub use topology::Topology;
