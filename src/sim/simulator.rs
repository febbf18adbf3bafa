//! 仿真器
//!
//! 运行循环：从调度器取事件交给控制面，把产生的后续事件放回调度器。
//! TERMINATE 停止循环，SERIALIZE 把当前状态交给 [`SnapshotSink`]。

use crate::control::ControlPlane;
use crate::error::{SchedulerError, SimError};
use crate::net::Stats;
use tracing::{debug, info};

use super::event::{Event, EventKind};
use super::scheduler::Scheduler;
use super::snapshot::{Snapshot, SnapshotSink};
use super::time::SimTime;

/// 运行停止的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 遇到 TERMINATE 事件
    Terminated,
    /// 没有任何待处理事件
    Drained,
    /// 下一个事件晚于 `run_until` 的截止时间
    Deadline,
}

/// 事件驱动仿真器
#[derive(Debug)]
pub struct Simulator {
    scheduler: Scheduler,
    control: ControlPlane,
    processed: u64,
}

impl Simulator {
    pub fn new(scheduler: Scheduler, control: ControlPlane) -> Self {
        Self {
            scheduler,
            control,
            processed: 0,
        }
    }

    /// 从快照恢复
    pub fn restore(snapshot: Snapshot) -> Self {
        info!(now = %snapshot.scheduler.now(), "♻️ 从快照恢复");
        Self::new(snapshot.scheduler, ControlPlane::from_state(snapshot.control))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.scheduler.clone(), self.control.state().clone())
    }

    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn control(&self) -> &ControlPlane {
        &self.control
    }

    pub fn stats(&self) -> Stats {
        self.control.stats()
    }

    /// 已处理的事件数
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// 调度事件
    pub fn schedule(&mut self, event: Event) {
        self.scheduler.insert(event);
    }

    /// 运行直到 TERMINATE 或没有事件
    #[tracing::instrument(skip_all)]
    pub fn run(&mut self, sink: &mut dyn SnapshotSink) -> Result<StopReason, SimError> {
        self.run_until(SimTime::MAX, sink)
    }

    /// 运行直到 TERMINATE、没有事件，或下一个事件晚于 `until`
    pub fn run_until(
        &mut self,
        until: SimTime,
        sink: &mut dyn SnapshotSink,
    ) -> Result<StopReason, SimError> {
        info!(now = %self.now(), until = %until, "▶️  开始运行仿真");
        let reason = loop {
            if self.scheduler.peek_time().is_some_and(|t| t > until) {
                break StopReason::Deadline;
            }
            let event = match self.scheduler.next_event() {
                Ok(ev) => ev,
                Err(SchedulerError::Drained) => break StopReason::Drained,
                Err(e) => return Err(e.into()),
            };
            self.processed += 1;
            debug!(
                event_num = self.processed,
                now = %event.fire_time,
                kind = event.kind.name(),
                remaining_queue = self.scheduler.pending(),
                "执行事件"
            );
            match event.kind {
                EventKind::Terminate => break StopReason::Terminated,
                EventKind::Serialize { name } => {
                    let snap = self.snapshot();
                    sink.save(&name, &snap)?;
                }
                _ => {
                    if let Some(next) = self.control.process(event)? {
                        self.scheduler.insert(next);
                    }
                }
            }
        };

        let stats = self.stats();
        info!(
            reason = ?reason,
            total_events = self.processed,
            final_time = %self.now(),
            requests = stats.requests,
            established = stats.established,
            failed = stats.failed,
            blocking = stats.blocking_probability(),
            "✅ 仿真结束"
        );
        Ok(reason)
    }
}
