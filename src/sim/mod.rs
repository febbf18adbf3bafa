//! 仿真核心模块
//!
//! 此模块包含事件驱动仿真的核心组件：仿真时间、事件、调度器、流量生成器、
//! 运行循环、快照与场景文件。

// 子模块声明
mod event;
mod generator;
mod scenario;
mod scheduled_event;
mod scheduler;
mod simulator;
mod snapshot;
mod time;

// 重新导出公共接口
pub use event::{Event, EventKind};
pub use generator::{PoissonTraffic, ScriptedRequest, ScriptedTraffic, TrafficModel};
pub use scenario::{
    FailureSpec, LinkDefaults, ProtocolSpec, SCENARIO_SCHEMA_VERSION, ScenarioSpec,
    ScriptedRequestSpec, SnapshotSpec, TopologySpec, TrafficSpec,
};
pub use scheduled_event::ScheduledEvent;
pub use scheduler::Scheduler;
pub use simulator::{Simulator, StopReason};
pub use snapshot::{
    JsonDirSink, MemorySink, NullSink, SNAPSHOT_SCHEMA_VERSION, Snapshot, SnapshotSink,
};
pub use time::SimTime;
