//! 调度器
//!
//! 维护两类待触发事件：
//! - 事件队列（按触发时间的最小堆，同一时刻按插入顺序）
//! - 流量生成器（按下一次触发时间的最小堆，同一时刻按注册顺序）
//!
//! `next_event` 取两者中较早的一个；同一时刻队列中的事件优先。

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::event::{Event, EventKind};
use super::generator::TrafficModel;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeneratorEntry {
    model: TrafficModel,
    fired: u64,
}

/// 调度器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    now: SimTime,
    next_seq: u64,
    queue: BinaryHeap<ScheduledEvent>,
    generators: Vec<GeneratorEntry>,
    /// (下一次触发时间, 生成器下标)；已退休的生成器不在堆里
    ready: BinaryHeap<Reverse<(SimTime, usize)>>,
    fired_total: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前仿真时间（最近一次返回事件的触发时间）
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 注册一个流量生成器，返回其下标
    pub fn add_generator(&mut self, mut model: TrafficModel) -> usize {
        let id = self.generators.len();
        let first = model.first_fire(self.now);
        debug!(generator = id, first_fire = ?first, "注册流量生成器");
        if let Some(at) = first {
            self.ready.push(Reverse((at, id)));
        }
        self.generators.push(GeneratorEntry { model, fired: 0 });
        id
    }

    pub fn generator_count(&self) -> usize {
        self.generators.len()
    }

    /// 生成器 `id` 已触发的次数
    pub fn fired(&self, id: usize) -> u64 {
        self.generators.get(id).map_or(0, |g| g.fired)
    }

    /// 所有生成器触发的总次数
    pub fn fired_total(&self) -> u64 {
        self.fired_total
    }

    /// 仍会继续触发的生成器数
    pub fn active_generators(&self) -> usize {
        self.ready.len()
    }

    /// 队列中待处理的事件数（不含生成器）
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// 插入事件；`Multiple` 按顺序展开
    pub fn insert(&mut self, event: Event) {
        match event.kind {
            EventKind::Multiple { events } => {
                for e in events {
                    self.insert(e);
                }
            }
            kind => {
                let at = event.fire_time;
                let seq = self.next_seq;
                self.next_seq = self.next_seq.wrapping_add(1);
                trace!(at = %at, seq, kind = kind.name(), "调度事件");
                self.queue.push(ScheduledEvent {
                    at,
                    seq,
                    ev: Event { kind, ..event },
                });
            }
        }
    }

    /// 下一个事件的触发时间（不取出）
    pub fn peek_time(&self) -> Option<SimTime> {
        let queued = self.queue.peek().map(|e| e.at);
        let generated = self.ready.peek().map(|Reverse((at, _))| *at);
        match (queued, generated) {
            (Some(q), Some(g)) => Some(q.min(g)),
            (q, g) => q.or(g),
        }
    }

    /// 取出下一个事件并推进时钟
    pub fn next_event(&mut self) -> Result<Event, SchedulerError> {
        if self.generators.is_empty() {
            return Err(SchedulerError::NoGenerators);
        }
        let queued = self.queue.peek().map(|e| e.at);
        let generated = self.ready.peek().map(|Reverse(key)| *key);

        match (queued, generated) {
            (None, None) => Err(SchedulerError::Drained),
            (q, Some((at, id))) if q.is_none_or(|q| at < q) => Ok(self.fire_generator(at, id)),
            _ => {
                let Some(item) = self.queue.pop() else {
                    return Err(SchedulerError::Drained);
                };
                self.now = self.now.max(item.at);
                Ok(item.ev)
            }
        }
    }

    fn fire_generator(&mut self, at: SimTime, id: usize) -> Event {
        self.ready.pop();
        self.now = self.now.max(at);
        let entry = &mut self.generators[id];
        let Some((request, next)) = entry.model.fire(at) else {
            // 脚本生成器提前耗尽：直接退休，本次不产生请求
            return Event::now(at, EventKind::Multiple { events: Vec::new() });
        };
        entry.fired += 1;
        self.fired_total += 1;
        match next {
            Some(n) => self.ready.push(Reverse((n.max(at), id))),
            None => debug!(generator = id, fired = entry.fired, "生成器退休"),
        }
        Event::now(at, EventKind::LightpathRequest { request })
    }
}
