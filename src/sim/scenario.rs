//! 场景文件（JSON）
//!
//! 一个场景描述拓扑、链路默认属性、协议参数、流量生成器、故障注入、
//! 终止时间与快照点。除 `schema_version` 与 `topology` 外所有字段都有默认值。

use std::path::Path;

use crate::control::ControlPlane;
use crate::error::ScenarioError;
use crate::net::{NodeId, Topology};
use crate::proto::{LightpathRequest, ProtocolConfig, RerouteStrategy, WavelengthPolicy};
use crate::topo::{LinkTemplate, MeshLink, build_mesh, build_nsfnet, build_ring};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::event::{Event, EventKind};
use super::generator::{PoissonTraffic, ScriptedRequest, ScriptedTraffic, TrafficModel};
use super::scheduler::Scheduler;
use super::simulator::Simulator;
use super::time::SimTime;

pub const SCENARIO_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub schema_version: u32,
    pub topology: TopologySpec,
    #[serde(default)]
    pub links: Option<LinkDefaults>,
    #[serde(default)]
    pub protocol: Option<ProtocolSpec>,
    #[serde(default)]
    pub traffic: Vec<TrafficSpec>,
    #[serde(default)]
    pub failures: Vec<FailureSpec>,
    /// 终止时间（秒）；不设置时跑到没有事件为止
    #[serde(default)]
    pub terminate_at_s: Option<f64>,
    #[serde(default)]
    pub snapshots: Vec<SnapshotSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologySpec {
    Ring {
        nodes: usize,
    },
    Nsfnet,
    Mesh {
        nodes: Vec<String>,
        links: Vec<MeshLink>,
    },
}

/// 链路默认属性（默认 8 波长、10 Gbps、100 km、时延按 5 µs/km 推算）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkDefaults {
    #[serde(default)]
    pub wavelengths: Option<u32>,
    #[serde(default)]
    pub data_rate_gbps: Option<f64>,
    #[serde(default)]
    pub length_km: Option<f64>,
    #[serde(default)]
    pub delay_us: Option<u64>,
}

impl LinkDefaults {
    pub fn template(&self) -> LinkTemplate {
        let d = LinkTemplate::default();
        LinkTemplate {
            wavelengths: self.wavelengths.unwrap_or(d.wavelengths),
            data_rate_gbps: self.data_rate_gbps.unwrap_or(d.data_rate_gbps),
            length_km: self.length_km.unwrap_or(d.length_km),
            delay: self.delay_us.map(SimTime::from_micros),
        }
    }
}

/// 协议参数（缺省值见 [`ProtocolConfig::default`]）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolSpec {
    #[serde(default)]
    pub reroute: Option<RerouteStrategy>,
    #[serde(default)]
    pub wavelength_policy: Option<WavelengthPolicy>,
    #[serde(default)]
    pub local_attempts: Option<u32>,
    #[serde(default)]
    pub global_attempts: Option<u32>,
    #[serde(default)]
    pub max_tries: Option<u32>,
    #[serde(default)]
    pub max_hops: Option<u32>,
    #[serde(default)]
    pub k_paths: Option<usize>,
    #[serde(default)]
    pub localization_delay_us: Option<u64>,
    #[serde(default)]
    pub control_delay_us: Option<u64>,
}

impl ProtocolSpec {
    pub fn config(&self) -> ProtocolConfig {
        let d = ProtocolConfig::default();
        ProtocolConfig {
            reroute: self.reroute.unwrap_or(d.reroute),
            wavelength_policy: self.wavelength_policy.unwrap_or(d.wavelength_policy),
            local_attempts: self.local_attempts.unwrap_or(d.local_attempts),
            global_attempts: self.global_attempts.unwrap_or(d.global_attempts),
            max_tries: self.max_tries.unwrap_or(d.max_tries),
            max_hops: self.max_hops.unwrap_or(d.max_hops),
            k_paths: self.k_paths.unwrap_or(d.k_paths),
            localization_delay: self
                .localization_delay_us
                .map_or(d.localization_delay, SimTime::from_micros),
            control_delay: self
                .control_delay_us
                .map_or(d.control_delay, SimTime::from_micros),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrafficSpec {
    Poisson {
        arrival_rate: f64,
        mean_holding_s: f64,
        #[serde(default)]
        requests: Option<u64>,
        #[serde(default)]
        seed: Option<u64>,
        #[serde(default)]
        pairs: Vec<(NodeId, NodeId)>,
    },
    Scripted {
        requests: Vec<ScriptedRequestSpec>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedRequestSpec {
    pub at_s: f64,
    pub source: NodeId,
    pub target: NodeId,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureSpec {
    Link { at_s: f64, a: NodeId, b: NodeId },
    Node { at_s: f64, node: NodeId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSpec {
    pub at_s: f64,
    pub name: String,
}

impl ScenarioSpec {
    pub fn from_json(s: &str) -> Result<Self, ScenarioError> {
        let spec: ScenarioSpec = serde_json::from_str(s)?;
        if spec.schema_version != SCENARIO_SCHEMA_VERSION {
            return Err(ScenarioError::SchemaVersion(spec.schema_version));
        }
        Ok(spec)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// 生效的协议参数
    pub fn protocol_config(&self) -> ProtocolConfig {
        self.protocol.clone().unwrap_or_default().config()
    }

    /// 覆盖重路由策略与波长分配策略（命令行参数）
    pub fn override_protocol(
        &mut self,
        reroute: Option<RerouteStrategy>,
        policy: Option<WavelengthPolicy>,
    ) {
        let p = self.protocol.get_or_insert_with(ProtocolSpec::default);
        if reroute.is_some() {
            p.reroute = reroute;
        }
        if policy.is_some() {
            p.wavelength_policy = policy;
        }
    }

    pub fn build_topology(&self) -> Result<Topology, ScenarioError> {
        let tpl = self.links.clone().unwrap_or_default().template();
        if tpl.wavelengths == 0 {
            return Err(ScenarioError::Topology("links need at least one wavelength".into()));
        }
        let topo = match &self.topology {
            TopologySpec::Ring { nodes } => {
                if *nodes < 2 {
                    return Err(ScenarioError::Topology(format!(
                        "ring needs at least 2 nodes, got {nodes}"
                    )));
                }
                build_ring(*nodes, &tpl)
            }
            TopologySpec::Nsfnet => build_nsfnet(&tpl),
            TopologySpec::Mesh { nodes, links } => build_mesh(nodes, links, &tpl)?,
        };
        Ok(topo)
    }

    /// 构建调度器：流量生成器、故障、快照点与终止事件
    pub fn build_scheduler(
        &self,
        topology: &Topology,
        cfg: &ProtocolConfig,
    ) -> Result<Scheduler, ScenarioError> {
        if self.traffic.is_empty() {
            return Err(ScenarioError::Traffic(
                "scenario needs at least one traffic generator".into(),
            ));
        }
        let check = |n: NodeId| {
            if topology.contains_node(n) {
                Ok(())
            } else {
                Err(ScenarioError::Traffic(format!("unknown node {n}")))
            }
        };

        let mut sched = Scheduler::new();
        for (i, t) in self.traffic.iter().enumerate() {
            let model = match t {
                TrafficSpec::Poisson {
                    arrival_rate,
                    mean_holding_s,
                    requests,
                    seed,
                    pairs,
                } => {
                    for &(s, d) in pairs {
                        check(s)?;
                        check(d)?;
                    }
                    TrafficModel::Poisson(PoissonTraffic::new(
                        *arrival_rate,
                        *mean_holding_s,
                        *requests,
                        seed.unwrap_or(i as u64),
                        topology.nodes().collect(),
                        pairs.clone(),
                        cfg.max_tries,
                    )?)
                }
                TrafficSpec::Scripted { requests } => {
                    let mut items = Vec::with_capacity(requests.len());
                    for r in requests {
                        check(r.source)?;
                        check(r.target)?;
                        items.push(ScriptedRequest {
                            at: SimTime::from_secs_f64(r.at_s),
                            request: LightpathRequest::new(
                                r.source,
                                r.target,
                                r.duration_s,
                                cfg.max_tries,
                            ),
                        });
                    }
                    TrafficModel::Scripted(ScriptedTraffic::new(items))
                }
            };
            sched.add_generator(model);
        }

        for f in &self.failures {
            let (at_s, kind) = match *f {
                FailureSpec::Link { at_s, a, b } => (at_s, EventKind::FailureLink { a, b }),
                FailureSpec::Node { at_s, node } => (at_s, EventKind::FailureNode { node }),
            };
            sched.insert(Event::new(SimTime::from_secs_f64(at_s), SimTime::ZERO, kind));
        }
        for s in &self.snapshots {
            sched.insert(Event::new(
                SimTime::from_secs_f64(s.at_s),
                SimTime::ZERO,
                EventKind::Serialize {
                    name: s.name.clone(),
                },
            ));
        }
        if let Some(t) = self.terminate_at_s {
            sched.insert(Event::new(
                SimTime::from_secs_f64(t),
                SimTime::ZERO,
                EventKind::Terminate,
            ));
        }
        Ok(sched)
    }

    /// 构建完整的仿真器
    pub fn build(&self) -> Result<Simulator, ScenarioError> {
        let topology = self.build_topology()?;
        let cfg = self.protocol_config();
        let scheduler = self.build_scheduler(&topology, &cfg)?;
        info!(
            nodes = topology.node_count(),
            edges = topology.edge_count(),
            generators = scheduler.generator_count(),
            "📄 场景已加载"
        );
        Ok(Simulator::new(scheduler, ControlPlane::new(topology, cfg)))
    }
}
