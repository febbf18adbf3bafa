//! 4 节点环上的 crankback 示例
//!
//! 先用 r0->r1 的请求占满 r0-r1 链路的全部波长，
//! 再发起 r0->r2：首选路径 r0-r1-r2 在 r1 处得到 RP_LABEL_SET，
//! 错误回到 r0 后就地改走 r0-r3-r2。

use clap::Parser;
use wdmsim_rs::control::ControlPlane;
use wdmsim_rs::net::NodeId;
use wdmsim_rs::proto::{LightpathRequest, ProtocolConfig, RerouteStrategy};
use wdmsim_rs::sim::{
    NullSink, Scheduler, ScriptedRequest, ScriptedTraffic, SimTime, Simulator, TrafficModel,
};
use wdmsim_rs::topo::{LinkTemplate, build_ring};

#[derive(Debug, Parser)]
#[command(name = "ring_crankback", about = "4 节点环：波长耗尽后的 crankback 重路由")]
struct Args {
    /// 每条链路的波长数（r0->r1 会被占满）
    #[arg(long, default_value_t = 2)]
    wavelengths: u32,
    /// 单向链路长度（公里）
    #[arg(long, default_value_t = 100.0)]
    length_km: f64,
    /// 关闭 crankback，改为端到端重试
    #[arg(long)]
    end_to_end: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let tpl = LinkTemplate {
        wavelengths: args.wavelengths,
        length_km: args.length_km,
        ..LinkTemplate::default()
    };
    let topo = build_ring(4, &tpl);
    let cfg = ProtocolConfig {
        reroute: if args.end_to_end {
            RerouteStrategy::EndToEnd
        } else {
            RerouteStrategy::Segment
        },
        ..ProtocolConfig::default()
    };

    let (a, b, c) = (NodeId(0), NodeId(1), NodeId(2));
    let mut items: Vec<ScriptedRequest> = (0..args.wavelengths)
        .map(|i| ScriptedRequest {
            at: SimTime::from_millis(u64::from(i)),
            request: LightpathRequest::new(a, b, 100.0, cfg.max_tries),
        })
        .collect();
    items.push(ScriptedRequest {
        at: SimTime::from_millis(u64::from(args.wavelengths) + 10),
        request: LightpathRequest::new(a, c, 1.0, cfg.max_tries),
    });

    let mut sched = Scheduler::new();
    sched.add_generator(TrafficModel::Scripted(ScriptedTraffic::new(items)));
    let mut sim = Simulator::new(sched, ControlPlane::new(topo, cfg));

    // 只运行到 r0->r2 建立之后、任何拆除之前
    sim.run_until(SimTime::from_millis(500), &mut NullSink)?;

    let stats = sim.stats();
    println!(
        "established={} failed={} crankbacks={} end_to_end_retries={}",
        stats.established, stats.failed, stats.crankbacks, stats.end_to_end_retries
    );
    if let Some(conn) = sim
        .control()
        .router(a)
        .and_then(|r| r.active_connections().values().next())
    {
        let route: Vec<String> = conn.route.iter().map(ToString::to_string).collect();
        println!(
            "lightpath {} route={} wavelength={}",
            conn.flow_id,
            route.join("->"),
            conn.wavelength
        );
    }
    Ok(())
}
