//! 测试用的单步运行器：记录每个被处理的事件，便于断言消息序列。

use crate::control::ControlPlane;
use crate::error::SchedulerError;
use crate::net::{NodeId, Topology};
use crate::proto::{Header, LightpathRequest, Packet, ProtocolConfig, SignalingMessage};
use crate::sim::{Event, EventKind, Scheduler, ScriptedTraffic, SimTime, TrafficModel};
use crate::topo::{LinkTemplate, MeshLink, build_mesh};

pub(super) struct Harness {
    pub sched: Scheduler,
    pub control: ControlPlane,
    pub log: Vec<Event>,
}

impl Harness {
    pub fn new(topology: Topology, cfg: ProtocolConfig) -> Self {
        let mut sched = Scheduler::new();
        sched.add_generator(TrafficModel::Scripted(ScriptedTraffic::default()));
        Self {
            sched,
            control: ControlPlane::new(topology, cfg),
            log: Vec::new(),
        }
    }

    pub fn request(&mut self, at: SimTime, source: usize, target: usize, duration: f64) {
        let max_tries = self.control.cfg().max_tries;
        self.sched.insert(Event::now(
            at,
            EventKind::LightpathRequest {
                request: LightpathRequest::new(NodeId(source), NodeId(target), duration, max_tries),
            },
        ));
    }

    pub fn schedule(&mut self, at: SimTime, kind: EventKind) {
        self.sched.insert(Event::now(at, kind));
    }

    /// 处理一个事件；没有事件时返回 false
    pub fn step(&mut self) -> bool {
        let ev = match self.sched.next_event() {
            Ok(ev) => ev,
            Err(SchedulerError::Drained) => return false,
            Err(e) => panic!("scheduler: {e}"),
        };
        self.log.push(ev.clone());
        if let Some(next) = self.control.process(ev).expect("process event") {
            self.sched.insert(next);
        }
        true
    }

    pub fn run_until(&mut self, until: SimTime) {
        while self.sched.peek_time().is_some_and(|t| t <= until) {
            self.step();
        }
    }

    pub fn run(&mut self) {
        while self.step() {}
    }

    /// 日志中所有信令到达：(to, from, msg)
    pub fn arrivals(&self, header: Header) -> Vec<(NodeId, Option<NodeId>, &SignalingMessage)> {
        self.log
            .iter()
            .filter_map(|e| match &e.kind {
                EventKind::PacketArrival {
                    to,
                    from,
                    packet: Packet::Signaling(m),
                } if m.header == header => Some((*to, *from, m)),
                _ => None,
            })
            .collect()
    }

    /// 占用某条单向链路上的波长（模拟已有业务）
    pub fn occupy(&mut self, from: usize, to: usize, wavelengths: &[u32]) {
        let link = self
            .control
            .router_mut(NodeId(from))
            .and_then(|r| r.links_mut().get_mut(NodeId(to)))
            .expect("link exists");
        for &w in wavelengths {
            link.mask.set_used(w).expect("wavelength free");
        }
    }

    pub fn available(&self, from: usize, to: usize) -> u32 {
        self.control
            .router(NodeId(from))
            .and_then(|r| r.links().get(NodeId(to)))
            .map_or(0, |l| l.mask.count_available())
    }
}

pub(super) fn template(wavelengths: u32) -> LinkTemplate {
    LinkTemplate {
        wavelengths,
        ..LinkTemplate::default()
    }
}

/// 以边表构建 mesh，节点名为 n0..n(count-1)
pub(super) fn mesh(count: usize, edges: &[(usize, usize)], wavelengths: u32) -> Topology {
    let names: Vec<String> = (0..count).map(|i| format!("n{i}")).collect();
    let links: Vec<MeshLink> = edges
        .iter()
        .map(|&(a, b)| MeshLink {
            a,
            b,
            length_km: None,
        })
        .collect();
    build_mesh(&names, &links, &template(wavelengths)).expect("valid mesh")
}
