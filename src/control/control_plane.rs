//! 控制面
//!
//! 持有拓扑、全部路由器、选路器与统计；把调度器给出的事件分派到
//! 对应的路由器，并在请求的终态（建立、失败、拆除）上做端到端决策：
//! 端到端重试、故障后的恢复、过期拆除的抑制。

use std::collections::{BTreeMap, BTreeSet};

use crate::error::SimError;
use crate::net::{Accounting, FlowId, KShortestPaths, NodeId, RouteProvider, Stats, Topology};
use crate::proto::{
    Connection, ErrorCode, Header, LabelSet, LightpathRequest, Packet, ProtocolConfig,
    RerouteStrategy, Router, RouterCtx, SignalingMessage, WavelengthPolicy,
};
use crate::sim::{Event, EventKind, SimTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// 控制面中可序列化的部分（快照内容）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlState {
    pub topology: Topology,
    pub routers: BTreeMap<NodeId, Router>,
    /// 因故障中断、正在或已经恢复的 flow（值为恢复用的请求）
    pub disrupted_by_failure: BTreeMap<FlowId, LightpathRequest>,
    /// 恢复成功后的新连接实例
    pub restored: BTreeMap<FlowId, Connection>,
    pub request_counter: u64,
    pub failure_counter: u64,
    pub removed_nodes: BTreeSet<NodeId>,
    pub cfg: ProtocolConfig,
    pub stats: Stats,
}

impl ControlState {
    /// 按拓扑为每个节点建立路由器
    pub fn new(topology: Topology, cfg: ProtocolConfig) -> Self {
        let routers = topology
            .nodes()
            .map(|n| (n, Router::new(n, &topology)))
            .collect();
        Self {
            topology,
            routers,
            disrupted_by_failure: BTreeMap::new(),
            restored: BTreeMap::new(),
            request_counter: 0,
            failure_counter: 0,
            removed_nodes: BTreeSet::new(),
            cfg,
            stats: Stats::default(),
        }
    }
}

/// 控制面
#[derive(Debug)]
pub struct ControlPlane {
    pub(super) state: ControlState,
    pub(super) routes: Box<dyn RouteProvider>,
}

impl ControlPlane {
    /// 使用固定 k 最短路选路
    pub fn new(topology: Topology, cfg: ProtocolConfig) -> Self {
        let routes = KShortestPaths::build(&topology, cfg.k_paths);
        Self::with_routes(topology, cfg, Box::new(routes))
    }

    pub fn with_routes(
        topology: Topology,
        cfg: ProtocolConfig,
        routes: Box<dyn RouteProvider>,
    ) -> Self {
        info!(
            nodes = topology.node_count(),
            edges = topology.edge_count(),
            reroute = ?cfg.reroute,
            policy = ?cfg.wavelength_policy,
            "🧭 控制面初始化"
        );
        Self {
            state: ControlState::new(topology, cfg),
            routes,
        }
    }

    /// 从快照状态恢复；选路器按当前拓扑重新计算
    pub fn from_state(state: ControlState) -> Self {
        let routes = KShortestPaths::build(&state.topology, state.cfg.k_paths);
        Self {
            state,
            routes: Box::new(routes),
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn topology(&self) -> &Topology {
        &self.state.topology
    }

    pub fn cfg(&self) -> &ProtocolConfig {
        &self.state.cfg
    }

    pub fn router(&self, id: NodeId) -> Option<&Router> {
        self.state.routers.get(&id)
    }

    pub fn router_mut(&mut self, id: NodeId) -> Option<&mut Router> {
        self.state.routers.get_mut(&id)
    }

    pub fn routers(&self) -> impl Iterator<Item = &Router> + '_ {
        self.state.routers.values()
    }

    pub fn is_disrupted(&self, flow: &FlowId) -> bool {
        self.state.disrupted_by_failure.contains_key(flow)
    }

    /// 统计快照，附带各节点 crankback 次数之和
    pub fn stats(&self) -> Stats {
        let mut stats = self.state.stats.clone();
        stats.crankbacks = self.state.routers.values().map(Router::crankbacks).sum();
        stats
    }

    /// 事件分派
    #[tracing::instrument(skip_all, fields(now = %event.fire_time, kind = event.kind.name()))]
    pub fn process(&mut self, event: Event) -> Result<Option<Event>, SimError> {
        let now = event.fire_time;
        let out = match event.kind {
            EventKind::PacketArrival { to, from, packet } => self.deliver(now, to, from, packet)?,
            EventKind::LightpathRequest { request } => self.on_request(now, request),
            EventKind::LightpathEstablished { msg } => self.on_established(now, msg)?,
            EventKind::LightpathProblem { msg } => self.on_problem(now, msg)?,
            EventKind::LightpathTeardown { connection } => self.on_teardown(now, connection),
            EventKind::LightpathRemoved { msg } => {
                info!(flow = %msg.flow_id, "🧹 lightpath 已移除");
                self.state.stats.add_removed(&msg);
                Vec::new()
            }
            EventKind::FailureLink { a, b } => self.fail_link(now, a, b),
            EventKind::FailureNode { node } => self.fail_node(now, node),
            EventKind::Multiple { events } => events,
            EventKind::Terminate | EventKind::Serialize { .. } => {
                debug!("运行控制事件交由仿真器处理");
                Vec::new()
            }
        };
        Ok(Event::bundle(now, out))
    }

    fn deliver(
        &mut self,
        now: SimTime,
        to: NodeId,
        from: Option<NodeId>,
        packet: Packet,
    ) -> Result<Vec<Event>, SimError> {
        let Some(router) = self.state.routers.get_mut(&to) else {
            if self.state.removed_nodes.contains(&to) {
                debug!(to = %to, "目的节点已失效，丢弃报文");
                self.state.stats.add_dropped();
                return Ok(self.bounce(now, to, from, packet));
            }
            return Err(SimError::UnknownNode(to));
        };
        let ctx = RouterCtx {
            now,
            topology: &self.state.topology,
            routes: self.routes.as_ref(),
            cfg: &self.state.cfg,
        };
        router.process(packet, from, &ctx)
    }

    /// 发往已失效节点的信令：进行中的请求仍要得到结果
    ///
    /// - PATH：发送方收到 PATH_ERR(RP_NO_ROUTE_AVAILABLE)，可就地 crankback
    /// - RESV：发送方收到 RESV_ERR，释放它与下游已提交的各跳
    /// - PATH_ERR / RESV_ERR：直接上报控制面
    ///
    /// 拆除消息与 LSP_FAILURE 由失效节点邻居收到的故障通告接手，只丢弃。
    fn bounce(
        &self,
        now: SimTime,
        dead: NodeId,
        from: Option<NodeId>,
        packet: Packet,
    ) -> Vec<Event> {
        let Packet::Signaling(mut msg) = packet else {
            return Vec::new();
        };
        let sender = from.filter(|f| self.state.routers.contains_key(f));
        let delay = self.state.cfg.control_delay;
        match msg.header {
            Header::Path => {
                msg.label_set = None;
                let err = msg.flip(Header::PathErr, Some(ErrorCode::NoRouteAvailable));
                match sender {
                    Some(to) => vec![Event::arrival(
                        now,
                        delay,
                        to,
                        Some(dead),
                        Packet::Signaling(err),
                    )],
                    None => vec![Event::now(now, EventKind::LightpathProblem { msg: err })],
                }
            }
            Header::Resv => {
                let err = msg.flip(Header::ResvErr, Some(ErrorCode::NoRouteAvailable));
                match sender {
                    Some(to) => vec![Event::arrival(
                        now,
                        delay,
                        to,
                        Some(dead),
                        Packet::Signaling(err),
                    )],
                    None => Vec::new(),
                }
            }
            Header::PathErr | Header::ResvErr
                if !msg.remove && msg.error != Some(ErrorCode::LspFailure) =>
            {
                let mut err = msg.flip(Header::PathErr, None);
                err.connection = None;
                if err.error.is_none() {
                    err.error = Some(ErrorCode::NoRouteAvailable);
                }
                warn!(flow = %err.flow_id, dead = %dead, error = ?err.error, "错误消息无法回到源节点，直接上报");
                vec![Event::now(now, EventKind::LightpathProblem { msg: err })]
            }
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------ requests

    fn on_request(&mut self, now: SimTime, request: LightpathRequest) -> Vec<Event> {
        self.state.stats.add_request();
        self.state.request_counter += 1;
        let flow = FlowId::new(self.state.request_counter, request.source, request.target);
        info!(flow = %flow, source = %request.source, target = %request.target, duration = request.duration, "📥 新的 lightpath 请求");

        let live = self.state.routers.contains_key(&request.source)
            && self.state.topology.contains_node(request.target);
        if request.source == request.target || !live {
            warn!(flow = %flow, "请求端点无效或已失效");
            let msg = SignalingMessage::path(flow, request, LabelSet::full(0), 0)
                .flip(Header::PathErr, Some(ErrorCode::NoRouteAvailable));
            self.fail(msg);
            return Vec::new();
        }
        vec![self.path_event(now, flow, request, false)]
    }

    /// 在源节点注入 PATH
    fn path_event(
        &self,
        now: SimTime,
        flow: FlowId,
        request: LightpathRequest,
        restoration: bool,
    ) -> Event {
        let source = request.source;
        let mut msg = SignalingMessage::path(flow, request, self.label_set(), self.state.cfg.max_hops);
        msg.restoration = restoration;
        Event::arrival(now, SimTime::ZERO, source, None, Packet::Signaling(msg))
    }

    /// 网络的波长数（所有链路相同）
    pub fn wavelengths(&self) -> u32 {
        self.state
            .routers
            .values()
            .flat_map(|r| r.links().iter())
            .map(|(_, l)| l.attrs.wavelengths)
            .max()
            .unwrap_or(0)
    }

    /// 每个波长在全网被占用的单向链路数
    pub fn wavelength_usage(&self) -> Vec<u32> {
        let mut usage = vec![0u32; self.wavelengths() as usize];
        for router in self.state.routers.values() {
            for (_, link) in router.links().iter() {
                for (w, slot) in usage.iter_mut().enumerate() {
                    if (w as u32) < link.mask.len() && !link.mask.is_available(w as u32) {
                        *slot += 1;
                    }
                }
            }
        }
        usage
    }

    /// 源端的满候选集合，顺序由波长分配策略决定
    fn label_set(&self) -> LabelSet {
        let w = self.wavelengths();
        match self.state.cfg.wavelength_policy {
            WavelengthPolicy::FirstFit => LabelSet::full(w),
            policy => LabelSet::with_order(w, policy.order(&self.wavelength_usage())),
        }
    }

    // ------------------------------------------------------------ outcomes

    fn on_established(
        &mut self,
        now: SimTime,
        mut msg: SignalingMessage,
    ) -> Result<Vec<Event>, SimError> {
        let Some(conn) = msg.connection.clone() else {
            return Err(SimError::UnexpectedHeader {
                header: msg.header.name(),
                node: msg.source,
                flow: msg.flow_id,
            });
        };
        let flow = msg.flow_id.clone();
        msg.restoration = msg.restoration || self.is_disrupted(&flow);
        self.state.stats.add_successful(&msg);
        if msg.restoration {
            info!(flow = %flow, route = ?conn.route, "🔧 lightpath 恢复成功");
            self.state.restored.insert(flow.clone(), conn.clone());
        }
        self.purge_flow(&flow);

        let at = now.saturating_add(conn.request.holding_time());
        debug!(flow = %flow, teardown_at = %at, "安排拆除");
        Ok(vec![Event::new(
            at,
            now,
            EventKind::LightpathTeardown { connection: conn },
        )])
    }

    fn on_problem(
        &mut self,
        now: SimTime,
        msg: SignalingMessage,
    ) -> Result<Vec<Event>, SimError> {
        match msg.error {
            Some(ErrorCode::LspFailure) => self.restore(now, msg),
            Some(ErrorCode::RerouteLimitExceeded) => {
                self.fail(msg);
                Ok(Vec::new())
            }
            _ => Ok(self.retry_or_fail(now, msg)),
        }
    }

    /// 故障拆除了连接：以剩余保持时间重新建立
    fn restore(&mut self, now: SimTime, msg: SignalingMessage) -> Result<Vec<Event>, SimError> {
        let Some(conn) = msg.connection.clone() else {
            return Err(SimError::UnexpectedHeader {
                header: msg.header.name(),
                node: msg.source,
                flow: msg.flow_id,
            });
        };
        let residual = conn.residual_duration(now);
        if self.state.cfg.reroute == RerouteStrategy::None || residual <= 0.0 {
            debug!(flow = %conn.flow_id, residual, "不做恢复");
            self.fail(msg);
            return Ok(Vec::new());
        }

        let flow = conn.flow_id.clone();
        let mut request = conn.request.clone();
        request.duration = residual;
        request.reset_try();
        self.state
            .disrupted_by_failure
            .insert(flow.clone(), request.clone());
        self.state.stats.restoration_attempts += 1;
        self.purge_flow(&flow);
        info!(flow = %flow, residual, "🔧 尝试恢复 lightpath");
        Ok(vec![self.path_event(now, flow, request, true)])
    }

    fn retry_or_fail(&mut self, now: SimTime, msg: SignalingMessage) -> Vec<Event> {
        let cfg = &self.state.cfg;
        let req = &msg.request;
        let can_retry = cfg.reroute != RerouteStrategy::None
            && self.state.routers.contains_key(&req.source)
            && req.current_try < req.max_tries
            && req.lifetime_tries <= cfg.global_attempts;
        if !can_retry {
            self.fail(msg);
            return Vec::new();
        }

        let mut request = msg.request.clone();
        request.add_try();
        self.purge_flow(&msg.flow_id);
        self.state.stats.end_to_end_retries += 1;
        info!(
            flow = %msg.flow_id,
            error = ?msg.error,
            current_try = request.current_try,
            lifetime_tries = request.lifetime_tries,
            "🔁 端到端重试"
        );
        vec![self.path_event(now, msg.flow_id.clone(), request, msg.restoration)]
    }

    /// 终态失败
    fn fail(&mut self, mut msg: SignalingMessage) {
        let flow = msg.flow_id.clone();
        self.purge_flow(&flow);
        if self.state.disrupted_by_failure.remove(&flow).is_some() {
            msg.restoration = true;
        }
        self.state.restored.remove(&flow);
        info!(
            flow = %flow,
            error = msg.error.map_or(ErrorCode::NAME_NONE, ErrorCode::name),
            restoration = msg.restoration,
            "❌ lightpath 请求失败"
        );
        self.state.stats.add_failed(&msg);
    }

    fn on_teardown(&mut self, now: SimTime, conn: Connection) -> Vec<Event> {
        let flow = conn.flow_id.clone();
        let source_holds = self
            .state
            .routers
            .get(&conn.source())
            .and_then(|r| r.connection(&flow))
            .is_some_and(|c| c.same_instance(&conn));
        let superseded = self.is_disrupted(&flow)
            && self
                .state
                .restored
                .get(&flow)
                .is_some_and(|r| !r.same_instance(&conn));
        if superseded || !source_holds {
            warn!(flow = %flow, superseded, source_holds, "过期的拆除请求，已抑制");
            self.state.stats.suppressed_teardowns += 1;
            return Vec::new();
        }

        if self
            .state
            .restored
            .get(&flow)
            .is_some_and(|r| r.same_instance(&conn))
        {
            self.state.restored.remove(&flow);
            self.state.disrupted_by_failure.remove(&flow);
        }
        debug!(flow = %flow, "⏱️ 保持时间到，发出 PATH_TEAR");
        let msg = SignalingMessage::for_connection(Header::PathTear, &conn);
        vec![Event::arrival(
            now,
            SimTime::ZERO,
            conn.source(),
            None,
            Packet::Signaling(msg),
        )]
    }

    /// 在所有路由器上清理该 flow 的临时crankback 状态
    pub(super) fn purge_flow(&mut self, flow: &FlowId) {
        for router in self.state.routers.values_mut() {
            router.purge_flow(flow);
        }
    }

    /// 检查每条单向链路的掩码与经过它的活动连接一致，且没有两个连接共用波长
    pub fn verify_masks(&self) -> Result<(), SimError> {
        for router in self.state.routers.values() {
            let id = router.id();
            let mut expected: BTreeMap<NodeId, BTreeSet<u32>> = BTreeMap::new();
            for conn in router.active_connections().values() {
                if conn.target() == id {
                    continue;
                }
                let Some(next) = conn.successor(id) else {
                    return Err(SimError::Invariant {
                        node: id,
                        reason: format!("connection {} does not traverse this node", conn.flow_id),
                    });
                };
                if !router.links().contains(next) {
                    continue;
                }
                if !expected.entry(next).or_default().insert(conn.wavelength) {
                    return Err(SimError::Invariant {
                        node: id,
                        reason: format!("wavelength {} shared toward {next}", conn.wavelength),
                    });
                }
            }
            for (nb, link) in router.links().iter() {
                let used: BTreeSet<u32> = (0..link.mask.len())
                    .filter(|&w| !link.mask.is_available(w))
                    .collect();
                let want = expected.remove(&nb).unwrap_or_default();
                if used != want {
                    return Err(SimError::Invariant {
                        node: id,
                        reason: format!("mask toward {nb} has {used:?}, connections hold {want:?}"),
                    });
                }
            }
        }
        Ok(())
    }
}
