//! 拓扑故障
//!
//! 控制面在两次分派之间修改拓扑：删除链路/节点、级联删除孤立节点、
//! 重建选路表，然后在 `localization_delay` 之后把故障通告交给仍存活的端点。
//! 之后的处理（泛洪、LSP_FAILURE、PATH_TEAR）全部由路由器完成。

use crate::net::NodeId;
use crate::proto::{FailureNotice, Packet};
use crate::sim::{Event, EventKind, SimTime};
use tracing::{info, warn};

use super::control_plane::ControlPlane;

impl ControlPlane {
    pub(super) fn fail_link(&mut self, now: SimTime, a: NodeId, b: NodeId) -> Vec<Event> {
        if !self.state.topology.remove_link(a, b) {
            warn!(a = %a, b = %b, "故障链路不存在，忽略");
            return Vec::new();
        }
        info!(a = %a, b = %b, "💥 链路故障");
        self.state.stats.link_failures += 1;
        self.remove_isolated();
        self.routes.rebuild(&self.state.topology);
        self.notify(now, a, b)
    }

    pub(super) fn fail_node(&mut self, now: SimTime, node: NodeId) -> Vec<Event> {
        if !self.state.topology.contains_node(node) {
            warn!(node = %node, "故障节点不存在，忽略");
            return Vec::new();
        }
        let neighbors = self.state.topology.remove_node(node);
        self.state.routers.remove(&node);
        self.state.removed_nodes.insert(node);
        info!(node = %node, neighbors = ?neighbors, "💥 节点故障");
        self.state.stats.node_failures += 1;
        self.remove_isolated();
        self.routes.rebuild(&self.state.topology);
        neighbors
            .into_iter()
            .flat_map(|nb| self.notify(now, node, nb))
            .collect()
    }

    /// 级联删除失去所有链路的节点
    fn remove_isolated(&mut self) {
        for n in self.state.topology.remove_isolated() {
            info!(node = %n, "节点失去全部链路，级联移除");
            self.state.routers.remove(&n);
            self.state.removed_nodes.insert(n);
        }
    }

    /// 为一条失效链路分配故障 id，通知仍存活的端点
    fn notify(&mut self, now: SimTime, a: NodeId, b: NodeId) -> Vec<Event> {
        self.state.failure_counter += 1;
        let notice = FailureNotice {
            id: self.state.failure_counter,
            a,
            b,
            detected_at: now,
        };
        let at = now.saturating_add(self.state.cfg.localization_delay);
        [a, b]
            .into_iter()
            .filter(|n| self.state.routers.contains_key(n))
            .map(|to| {
                Event::new(
                    at,
                    now,
                    EventKind::PacketArrival {
                        to,
                        from: None,
                        packet: Packet::LinkFailure(notice.clone()),
                    },
                )
            })
            .collect()
    }
}
