//! 信令协议模块
//!
//! 包含信令消息、lightpath 请求/连接、协议参数，以及每个节点上的协议状态机。

mod message;
mod request;
mod reroute;
mod router;

pub use message::{ErrorCode, FailureNotice, Header, LabelSet, Packet, SignalingMessage};
pub use request::{Connection, LightpathRequest, predecessor, successor};
pub use reroute::{ProtocolConfig, RerouteStrategy, WavelengthPolicy};
pub use router::{NOTIFY_OFFSET, Router, RouterCtx, StashedPath};
