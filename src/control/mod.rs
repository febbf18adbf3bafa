//! 控制面模块
//!
//! 事件分派、端到端重试与故障恢复决策、拓扑故障处理。

mod control_plane;
mod failure;

pub use control_plane::{ControlPlane, ControlState};
