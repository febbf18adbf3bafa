//! 路由器（光交叉节点）协议状态机
//!
//! 节点在消息之间没有显式状态：状态隐含在消息头里，节点只维护
//! - 链路资源表（下游邻居 → 波长掩码）
//! - 活动连接表（flow id → 连接）
//! - 已见过的故障 id（通告去重）
//! - 每个 flow 的 tabu 历史与暂存的crankback 状态（仅在请求进行中有效）
//!
//! 每条消息同步处理，产生固定的少量后续事件。

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{MaskError, SimError};
use crate::net::{FlowId, LinkTable, NodeId, RouteProvider, RouteQuery, Topology};
use crate::sim::{Event, EventKind, SimTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::message::{ErrorCode, FailureNotice, Header, LabelSet, Packet, SignalingMessage};
use super::request::{Connection, predecessor};
use super::reroute::{ProtocolConfig, RerouteStrategy};

/// 故障通告及其触发的本地 PATH_ERR/PATH_TEAR 额外加上的固定时延，
/// 避免与泛洪事件本身在同一时刻排序相撞。
pub const NOTIFY_OFFSET: SimTime = SimTime(1_000);

/// 处理一条消息时借给路由器的上下文
pub struct RouterCtx<'a> {
    pub now: SimTime,
    pub topology: &'a Topology,
    pub routes: &'a dyn RouteProvider,
    pub cfg: &'a ProtocolConfig,
}

/// PATH 经过本节点时暂存的crankback 状态，crankback 时从这里重新发出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StashedPath {
    pub label_set: LabelSet,
    pub hop_limit: u32,
}

/// 路由器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Router {
    id: NodeId,
    links: LinkTable,
    active_connections: BTreeMap<FlowId, Connection>,
    failure_ids_seen: BTreeSet<u64>,
    tabu_history: BTreeMap<FlowId, BTreeSet<NodeId>>,
    stashed_paths: BTreeMap<FlowId, StashedPath>,
    crankbacks: u64,
}

impl Router {
    /// 创建路由器，链路表取自拓扑中该节点的出边
    pub fn new(id: NodeId, topology: &Topology) -> Self {
        let mut links = LinkTable::default();
        for (nb, attrs) in topology.links_from(id) {
            links.insert(nb, attrs.clone());
        }
        Self {
            id,
            links,
            active_connections: BTreeMap::new(),
            failure_ids_seen: BTreeSet::new(),
            tabu_history: BTreeMap::new(),
            stashed_paths: BTreeMap::new(),
            crankbacks: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut LinkTable {
        &mut self.links
    }

    pub fn active_connections(&self) -> &BTreeMap<FlowId, Connection> {
        &self.active_connections
    }

    pub fn connection(&self, flow: &FlowId) -> Option<&Connection> {
        self.active_connections.get(flow)
    }

    pub fn tabu(&self, flow: &FlowId) -> Option<&BTreeSet<NodeId>> {
        self.tabu_history.get(flow)
    }

    pub fn has_seen_failure(&self, id: u64) -> bool {
        self.failure_ids_seen.contains(&id)
    }

    /// 是否还留有该 flow 的临时crankback 状态
    pub fn has_crankback_state(&self, flow: &FlowId) -> bool {
        self.tabu_history.contains_key(flow) || self.stashed_paths.contains_key(flow)
    }

    /// 是否还留有任何 flow 的临时crankback 状态
    pub fn has_any_crankback_state(&self) -> bool {
        !self.tabu_history.is_empty() || !self.stashed_paths.is_empty()
    }

    /// 本节点发起 crankback 的次数
    pub fn crankbacks(&self) -> u64 {
        self.crankbacks
    }

    /// 清理该 flow 的 tabu 与暂存crankback 状态
    pub fn purge_flow(&mut self, flow: &FlowId) {
        let had_tabu = self.tabu_history.remove(flow).is_some();
        let had_stash = self.stashed_paths.remove(flow).is_some();
        if had_tabu || had_stash {
            trace!(node = %self.id, flow = %flow, had_tabu, had_stash, "清理crankback 状态");
        }
    }

    /// 处理一个到达的控制报文
    #[tracing::instrument(skip(self, packet, ctx), fields(node = %self.id, now = %ctx.now, flow = ?packet.flow_id()))]
    pub fn process(
        &mut self,
        packet: Packet,
        from: Option<NodeId>,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        match packet {
            Packet::LinkFailure(notice) => self.on_link_failure(notice, from, ctx),
            Packet::Signaling(msg) => {
                debug!(header = msg.header.name(), from = ?from, "📨 信令到达");
                match msg.header {
                    Header::Path => self.on_path(msg, ctx),
                    Header::PathErr => self.on_path_err(msg, from, ctx),
                    Header::Resv => self.on_resv(msg, ctx),
                    Header::ResvErr => self.on_resv_err(msg, ctx),
                    Header::PathTear => self.on_path_tear(msg, ctx),
                    Header::ResvTear => self.on_resv_tear(msg, ctx),
                }
            }
        }
    }

    fn unexpected(&self, msg: &SignalingMessage) -> SimError {
        SimError::UnexpectedHeader {
            header: msg.header.name(),
            node: self.id,
            flow: msg.flow_id.clone(),
        }
    }

    fn invariant(&self, reason: impl Into<String>) -> SimError {
        SimError::Invariant {
            node: self.id,
            reason: reason.into(),
        }
    }

    /// 沿链路把消息发给邻居；链路表项已不存在时走带外控制信道
    fn send(&self, to: NodeId, msg: SignalingMessage, ctx: &RouterCtx<'_>) -> Event {
        let delay = self
            .links
            .get(to)
            .map_or(ctx.cfg.control_delay, |l| l.attrs.delay);
        trace!(to = %to, header = msg.header.name(), delay = %delay, "发送信令");
        Event::arrival(ctx.now, delay, to, Some(self.id), Packet::Signaling(msg))
    }

    fn problem(&self, msg: SignalingMessage, ctx: &RouterCtx<'_>) -> Event {
        info!(flow = %msg.flow_id, error = ?msg.error, "⚠️ lightpath 问题上报控制面");
        Event::now(ctx.now, EventKind::LightpathProblem { msg })
    }

    fn send_backward(
        &self,
        msg: SignalingMessage,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let prev = predecessor(&msg.route, self.id)
            .ok_or_else(|| self.invariant(format!("no predecessor in route {:?}", msg.route)))?;
        Ok(vec![self.send(prev, msg, ctx)])
    }

    // ---------------------------------------------------------------- PATH

    fn on_path(
        &mut self,
        msg: SignalingMessage,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let Some(label_set) = msg.label_set.as_ref() else {
            return Err(self.unexpected(&msg));
        };
        if label_set.is_empty() {
            debug!("候选波长集合为空 (RP_LABEL_SET)");
            return self.path_error(msg, ErrorCode::WavelengthUnavailable, ctx);
        }
        if msg.target != self.id {
            return self.forward_path(msg, ctx);
        }

        let Some(wavelength) = label_set.first_available() else {
            return self.path_error(msg, ErrorCode::WavelengthUnavailable, ctx);
        };
        let conn = Connection {
            route: msg.route.clone(),
            wavelength,
            flow_id: msg.flow_id.clone(),
            request: msg.request.clone(),
            start_time: ctx.now,
        };
        info!(wavelength, route = ?conn.route, "🎯 PATH 到达目的节点，选定波长");
        self.supersede(&conn)?;
        self.active_connections
            .insert(conn.flow_id.clone(), conn.clone());

        let mut resv = msg.flip(Header::Resv, None);
        resv.label_set = None;
        resv.connection = Some(conn);
        self.send_backward(resv, ctx)
    }

    /// 源节点与中间节点：选下一跳、求交、转发
    fn forward_path(
        &mut self,
        mut msg: SignalingMessage,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let Some(label_set) = msg.label_set.clone() else {
            return Err(self.unexpected(&msg));
        };
        self.stashed_paths.insert(
            msg.flow_id.clone(),
            StashedPath {
                label_set,
                hop_limit: msg.hop_limit,
            },
        );

        let empty = BTreeSet::new();
        let tabu = self.tabu_history.get(&msg.flow_id).unwrap_or(&empty);
        let query = RouteQuery {
            flow_id: &msg.flow_id,
            at: self.id,
            source: msg.source,
            target: msg.target,
            attempt: msg.request.current_try,
            tabu,
            visited: &msg.route,
        };
        let next = ctx.routes.next_hop(&query).filter(|&n| {
            msg.hop_limit > 0 && ctx.topology.has_edge(self.id, n) && self.links.contains(n)
        });
        let Some(next) = next else {
            debug!(hop_limit = msg.hop_limit, tabu = ?tabu, "没有可用下一跳 (RP_NO_ROUTE_AVAILABLE)");
            return self.path_error(msg, ErrorCode::NoRouteAvailable, ctx);
        };

        let Some(link) = self.links.get(next) else {
            return Err(self.invariant(format!("link toward {next} vanished")));
        };
        let before = msg.label_set.as_ref().map_or(0, LabelSet::count_available);
        if let Some(ls) = msg.label_set.as_mut() {
            ls.intersect(&link.mask).map_err(|source| SimError::Mask {
                node: self.id,
                neighbor: next,
                source,
            })?;
        }
        let after = msg.label_set.as_ref().map_or(0, LabelSet::count_available);
        debug_assert!(after <= before, "label set grew: {before} -> {after}");

        msg.hop_limit -= 1;
        msg.route.push(next);
        debug!(next = %next, before, after, hop_limit = msg.hop_limit, "🚀 转发 PATH");
        Ok(vec![self.send(next, msg, ctx)])
    }

    /// PATH 失败：源节点直接上报，其它节点翻转为 PATH_ERR 反向发送
    fn path_error(
        &mut self,
        msg: SignalingMessage,
        code: ErrorCode,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let mut err = msg.flip(Header::PathErr, Some(code));
        err.label_set = None;
        self.purge_flow(&err.flow_id);
        if err.source == self.id {
            return Ok(vec![self.problem(err, ctx)]);
        }
        self.send_backward(err, ctx)
    }

    // ------------------------------------------------------------ PATH_ERR

    fn on_path_err(
        &mut self,
        msg: SignalingMessage,
        from: Option<NodeId>,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        if msg.remove || msg.error == Some(ErrorCode::LspFailure) {
            return self.on_lsp_failure(msg, ctx);
        }
        let Some(code) = msg.error else {
            return Err(self.unexpected(&msg));
        };
        if ctx.cfg.reroute == RerouteStrategy::Segment
            && code.is_crankback_eligible()
            && self.stashed_paths.contains_key(&msg.flow_id)
        {
            return self.crankback(msg, from, code, ctx);
        }
        self.propagate_path_err(msg, ctx)
    }

    /// 在本节点就地尝试另一个邻居；预算不足时继续向上游回退
    fn crankback(
        &mut self,
        mut msg: SignalingMessage,
        from: Option<NodeId>,
        code: ErrorCode,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let offender = from
            .or_else(|| super::request::successor(&msg.route, self.id))
            .ok_or_else(|| self.invariant("PATH_ERR without a downstream sender"))?;
        let tabu = self.tabu_history.entry(msg.flow_id.clone()).or_default();
        tabu.insert(offender);
        let tabu_size = tabu.len() as u32;
        msg.request.add_try();

        // 源节点可以尝试所有邻居；中间节点要排除上游邻居。
        let at_source = self.id == msg.source;
        let neighbor_count = if at_source {
            self.links.len()
        } else {
            self.links.len().saturating_sub(1)
        } as u32;

        let Some(stash) = self.stashed_paths.get(&msg.flow_id).cloned() else {
            return Err(self.invariant("crankback without a stashed PATH"));
        };
        let local_ok = tabu_size <= ctx.cfg.local_attempts && tabu_size < neighbor_count;
        let global_ok =
            msg.request.lifetime_tries <= ctx.cfg.global_attempts && stash.hop_limit > 0;

        if local_ok && global_ok {
            self.crankbacks += 1;
            info!(
                offender = %offender,
                tabu_size,
                neighbor_count,
                lifetime_tries = msg.request.lifetime_tries,
                error = code.name(),
                "↩️ crankback：从本节点重新发出 PATH"
            );
            let pos = msg
                .route
                .iter()
                .position(|&n| n == self.id)
                .ok_or_else(|| self.invariant("crankback node missing from route"))?;
            msg.route.truncate(pos + 1);
            msg.header = Header::Path;
            msg.error = None;
            msg.label_set = Some(stash.label_set);
            msg.hop_limit = stash.hop_limit;
            return self.forward_path(msg, ctx);
        }

        // 上游节点不会再对 RP_REROUTING_LIMIT_EXCEEDED 做 crankback。
        debug!(
            tabu_size,
            neighbor_count,
            local_ok,
            global_ok,
            original = code.name(),
            "crankback 预算不足，升级为 RP_REROUTING_LIMIT_EXCEEDED"
        );
        msg.error = Some(ErrorCode::RerouteLimitExceeded);
        self.propagate_path_err(msg, ctx)
    }

    fn propagate_path_err(
        &mut self,
        msg: SignalingMessage,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        self.purge_flow(&msg.flow_id);
        if msg.source == self.id {
            return Ok(vec![self.problem(msg, ctx)]);
        }
        self.send_backward(msg, ctx)
    }

    /// LSP_FAILURE：沿连接自己保存的路径回到真正的源节点，沿途释放资源
    fn on_lsp_failure(
        &mut self,
        msg: SignalingMessage,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let Some(conn) = msg.connection.clone() else {
            return Err(self.unexpected(&msg));
        };
        let removed_here = self.remove_if_same(&conn)?;
        if conn.source() == self.id {
            if removed_here {
                return Ok(vec![self.problem(msg, ctx)]);
            }
            warn!(flow = %conn.flow_id, "源节点已无该连接实例，忽略 LSP_FAILURE");
            return Ok(Vec::new());
        }
        let prev = conn
            .predecessor(self.id)
            .ok_or_else(|| self.invariant("LSP_FAILURE at a node outside the connection"))?;
        Ok(vec![self.send(prev, msg, ctx)])
    }

    // ---------------------------------------------------------------- RESV

    fn on_resv(
        &mut self,
        msg: SignalingMessage,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let Some(conn) = msg.connection.clone() else {
            return Err(self.unexpected(&msg));
        };
        let next = conn
            .successor(self.id)
            .ok_or_else(|| self.invariant("RESV at a node without a downstream hop"))?;
        self.supersede(&conn)?;

        if !ctx.topology.contains_node(next) {
            // 下游各跳由失效节点的邻居在收到故障通告后拆除
            debug!(next = %next, "下游节点已失效，就地回退");
            let mut err = msg;
            err.connection = None;
            return self.path_error(err, ErrorCode::NoRouteAvailable, ctx);
        }
        let live = ctx.topology.has_edge(self.id, next);
        let reserved = match self.links.get_mut(next) {
            Some(link) if live => link.mask.set_used(conn.wavelength),
            _ => {
                debug!(next = %next, "链路已失效，预留失败");
                return self.resv_error(msg, &conn, ErrorCode::NoRouteAvailable, ctx);
            }
        };
        match reserved {
            Ok(()) => {}
            Err(MaskError::AlreadyUsed(w)) => {
                info!(wavelength = w, next = %next, "⚔️ 波长竞争失败 (ADMISSION_CONTROL_FAILURE)");
                return self.resv_error(msg, &conn, ErrorCode::AdmissionControlFailure, ctx);
            }
            Err(source) => {
                return Err(SimError::Mask {
                    node: self.id,
                    neighbor: next,
                    source,
                });
            }
        }

        debug!(wavelength = conn.wavelength, next = %next, "✅ 预留成功");
        self.active_connections
            .insert(conn.flow_id.clone(), conn.clone());
        self.purge_flow(&conn.flow_id);

        if conn.source() == self.id {
            info!(flow = %conn.flow_id, route = ?conn.route, wavelength = conn.wavelength, "🌈 lightpath 建立");
            return Ok(vec![Event::now(
                ctx.now,
                EventKind::LightpathEstablished { msg },
            )]);
        }
        let prev = conn
            .predecessor(self.id)
            .ok_or_else(|| self.invariant("RESV at a node outside the connection"))?;
        Ok(vec![self.send(prev, msg, ctx)])
    }

    /// RESV 失败：翻转为 RESV_ERR 正向发送，回退已经预留的下游各跳
    fn resv_error(
        &mut self,
        msg: SignalingMessage,
        conn: &Connection,
        code: ErrorCode,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let next = conn
            .successor(self.id)
            .ok_or_else(|| self.invariant("RESV_ERR without a downstream hop"))?;
        let err = msg.flip(Header::ResvErr, Some(code));
        Ok(vec![self.send(next, err, ctx)])
    }

    // ------------------------------------------------------------ RESV_ERR

    fn on_resv_err(
        &mut self,
        msg: SignalingMessage,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let Some(conn) = msg.connection.clone() else {
            return Err(self.unexpected(&msg));
        };
        self.remove_if_same(&conn)?;

        if conn.target() == self.id {
            // 目的节点把失败的提交降级为普通的 PATH_ERR，送回源节点。
            debug!(error = ?msg.error, "RESV_ERR 到达目的节点，转为 PATH_ERR");
            let mut err = msg.flip(Header::PathErr, None);
            err.connection = None;
            err.route = conn.route.clone();
            return self.send_backward(err, ctx);
        }
        let next = conn
            .successor(self.id)
            .ok_or_else(|| self.invariant("RESV_ERR at a node outside the connection"))?;
        Ok(vec![self.send(next, msg, ctx)])
    }

    // ---------------------------------------------------------- PATH_TEAR

    fn on_path_tear(
        &mut self,
        msg: SignalingMessage,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let Some(conn) = msg.connection.clone() else {
            return Err(self.unexpected(&msg));
        };
        let removed_here = self.remove_if_same(&conn)?;
        if !removed_here {
            warn!(flow = %conn.flow_id, "本节点没有该连接实例，PATH_TEAR 只继续转发");
        }
        if conn.target() == self.id {
            if msg.remove {
                // 故障触发的拆除：该请求已作为 LSP_FAILURE 上报，不再计为移除
                debug!(flow = %conn.flow_id, removed_here, "故障下游段拆除完成");
                return Ok(Vec::new());
            }
            if removed_here {
                info!(flow = %conn.flow_id, "🧹 lightpath 拆除完成");
                return Ok(vec![Event::now(ctx.now, EventKind::LightpathRemoved { msg })]);
            }
            return Ok(Vec::new());
        }
        let next = conn
            .successor(self.id)
            .ok_or_else(|| self.invariant("PATH_TEAR at a node outside the connection"))?;
        Ok(vec![self.send(next, msg, ctx)])
    }

    // ---------------------------------------------------------- RESV_TEAR

    fn on_resv_tear(
        &mut self,
        msg: SignalingMessage,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        let Some(conn) = msg.connection.clone() else {
            return Err(self.unexpected(&msg));
        };
        let removed_here = self.remove_if_same(&conn)?;
        if conn.source() == self.id {
            if removed_here {
                info!(flow = %conn.flow_id, "🧹 lightpath 反向拆除完成");
                return Ok(vec![Event::now(ctx.now, EventKind::LightpathRemoved { msg })]);
            }
            return Ok(Vec::new());
        }
        let prev = conn
            .predecessor(self.id)
            .ok_or_else(|| self.invariant("RESV_TEAR at a node outside the connection"))?;
        Ok(vec![self.send(prev, msg, ctx)])
    }

    // -------------------------------------------------------- LINK_FAILURE

    fn on_link_failure(
        &mut self,
        notice: FailureNotice,
        from: Option<NodeId>,
        ctx: &RouterCtx<'_>,
    ) -> Result<Vec<Event>, SimError> {
        if !self.failure_ids_seen.insert(notice.id) {
            trace!(failure_id = notice.id, "重复的故障通告，忽略");
            return Ok(Vec::new());
        }
        let other = notice.other(self.id);
        if let Some(other) = other {
            self.links.remove(other);
            info!(failure_id = notice.id, neighbor = %other, "💥 相邻链路故障，删除链路表项");
        } else {
            debug!(failure_id = notice.id, a = %notice.a, b = %notice.b, "收到故障通告");
        }

        let targets: Vec<NodeId> = self.links.neighbors().filter(|&n| Some(n) != from).collect();
        let mut events: Vec<Event> = Packet::LinkFailure(notice.clone())
            .fan_out(targets)
            .into_iter()
            .map(|(to, pkt)| {
                let delay = self
                    .links
                    .get(to)
                    .map_or(ctx.cfg.control_delay, |l| l.attrs.delay)
                    .saturating_add(NOTIFY_OFFSET);
                Event::arrival(ctx.now, delay, to, Some(self.id), pkt)
            })
            .collect();

        if let Some(other) = other {
            for conn in self.active_connections.values() {
                let header = if conn.traverses(self.id, other) {
                    Header::PathErr
                } else if conn.traverses(other, self.id) {
                    Header::PathTear
                } else {
                    continue;
                };
                let mut m = SignalingMessage::for_connection(header, conn);
                m.remove = true;
                if header == Header::PathErr {
                    m.error = Some(ErrorCode::LspFailure);
                }
                debug!(flow = %conn.flow_id, header = header.name(), "受故障影响的连接");
                events.push(Event::arrival(
                    ctx.now,
                    NOTIFY_OFFSET,
                    self.id,
                    Some(other),
                    Packet::Signaling(m),
                ));
            }
        }
        Ok(events)
    }

    // ------------------------------------------------------------ helpers

    /// 释放本节点为连接预留的下游一跳（目的节点没有下游，无需释放）
    fn release_hop(&mut self, conn: &Connection) -> Result<(), SimError> {
        if conn.target() == self.id {
            return Ok(());
        }
        let next = conn
            .successor(self.id)
            .ok_or_else(|| self.invariant("release at a node outside the connection"))?;
        match self.links.get_mut(next) {
            Some(link) => link
                .mask
                .clear(conn.wavelength)
                .map_err(|source| SimError::Mask {
                    node: self.id,
                    neighbor: next,
                    source,
                }),
            None => {
                trace!(next = %next, "链路表项已随故障删除，无需释放");
                Ok(())
            }
        }
    }

    /// 若本节点保存的正是这个连接实例则删除并释放，返回是否删除
    fn remove_if_same(&mut self, conn: &Connection) -> Result<bool, SimError> {
        let same = self
            .active_connections
            .get(&conn.flow_id)
            .is_some_and(|c| c.same_instance(conn));
        if !same {
            return Ok(false);
        }
        self.active_connections.remove(&conn.flow_id);
        self.release_hop(conn)?;
        Ok(true)
    }

    /// 同一 flow 的旧连接实例（恢复抢在拆除消息之前到达）先行释放
    fn supersede(&mut self, conn: &Connection) -> Result<(), SimError> {
        let stale = match self.active_connections.get(&conn.flow_id) {
            Some(old) if !old.same_instance(conn) => old.clone(),
            _ => return Ok(()),
        };
        warn!(flow = %conn.flow_id, old_route = ?stale.route, "旧连接实例被取代，先释放其资源");
        self.active_connections.remove(&conn.flow_id);
        self.release_hop(&stale)
    }
}
