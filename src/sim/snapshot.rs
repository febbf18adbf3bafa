//! 快照：保存/恢复完整的仿真状态
//!
//! 快照包含调度器（事件队列、生成器、时钟）与控制面状态；选路器不在其中，
//! 恢复时按快照里的拓扑重新计算。

use std::fs;
use std::path::{Path, PathBuf};

use crate::control::ControlState;
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::scheduler::Scheduler;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub scheduler: Scheduler,
    pub control: ControlState,
}

impl Snapshot {
    pub fn new(scheduler: Scheduler, control: ControlState) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            scheduler,
            control,
        }
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, SimError> {
        let snap: Snapshot = serde_json::from_str(s)?;
        if snap.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SimError::SnapshotVersion(snap.schema_version));
        }
        Ok(snap)
    }

    pub fn load(path: &Path) -> Result<Self, SimError> {
        let s = fs::read_to_string(path)?;
        Self::from_json(&s)
    }
}

/// 快照的去处
pub trait SnapshotSink {
    fn save(&mut self, name: &str, snapshot: &Snapshot) -> Result<(), SimError>;
}

/// 丢弃所有快照
#[derive(Debug, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn save(&mut self, _name: &str, _snapshot: &Snapshot) -> Result<(), SimError> {
        Ok(())
    }
}

/// 保留在内存里
#[derive(Debug, Default)]
pub struct MemorySink {
    pub saved: Vec<(String, Snapshot)>,
}

impl SnapshotSink for MemorySink {
    fn save(&mut self, name: &str, snapshot: &Snapshot) -> Result<(), SimError> {
        self.saved.push((name.to_string(), snapshot.clone()));
        Ok(())
    }
}

/// 写成 `<dir>/<name>.json`
#[derive(Debug)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SimError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl SnapshotSink for JsonDirSink {
    fn save(&mut self, name: &str, snapshot: &Snapshot) -> Result<(), SimError> {
        let path = self.path_for(name);
        fs::write(&path, snapshot.to_json()?)?;
        info!(path = %path.display(), "💾 快照已写出");
        Ok(())
    }
}
