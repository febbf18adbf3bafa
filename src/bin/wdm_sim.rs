//! WDM 光网络控制面仿真
//!
//! 读取场景文件（或快照）运行仿真，输出统计信息。

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use wdmsim_rs::proto::{RerouteStrategy, WavelengthPolicy};
use wdmsim_rs::sim::{
    JsonDirSink, NullSink, ScenarioSpec, SimTime, Simulator, Snapshot, SnapshotSink,
};

#[derive(Debug, Parser)]
#[command(
    name = "wdm-sim",
    about = "Run a scenario JSON on the WDM control-plane simulator"
)]
struct Args {
    /// Path to scenario.json
    #[arg(long, required_unless_present = "restore")]
    scenario: Option<PathBuf>,

    /// Resume from a snapshot JSON instead of a scenario
    #[arg(long, conflicts_with = "scenario")]
    restore: Option<PathBuf>,

    /// Run until this time (s); defaults to terminate_at_s or completion
    #[arg(long)]
    until_s: Option<f64>,

    /// Write final statistics as JSON
    #[arg(long)]
    stats_json: Option<PathBuf>,

    /// Directory for snapshots taken at SERIALIZE events
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Override reroute strategy
    #[arg(long, value_enum, conflicts_with = "restore")]
    reroute: Option<RerouteStrategy>,

    /// Override wavelength policy
    #[arg(long, value_enum, conflicts_with = "restore")]
    policy: Option<WavelengthPolicy>,
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

    let mut sim = match (&args.restore, &args.scenario) {
        (Some(path), _) => Simulator::restore(Snapshot::load(path)?),
        (None, Some(path)) => {
            let mut spec = ScenarioSpec::load(path)?;
            spec.override_protocol(args.reroute, args.policy);
            spec.build()?
        }
        (None, None) => return Err("either --scenario or --restore is required".into()),
    };

    let mut sink: Box<dyn SnapshotSink> = match &args.snapshot_dir {
        Some(dir) => Box::new(JsonDirSink::new(dir)?),
        None => Box::new(NullSink),
    };
    let until = args.until_s.map_or(SimTime::MAX, SimTime::from_secs_f64);
    let reason = sim.run_until(until, sink.as_mut())?;

    let stats = sim.stats();
    info!(reason = ?reason, "统计输出");
    println!(
        "summary reason={:?} time_s={:.6} requests={} established={} restored={} failed={} removed={} crankbacks={} blocking={:.6}",
        reason,
        sim.now().as_secs_f64(),
        stats.requests,
        stats.established,
        stats.restored,
        stats.failed,
        stats.removed,
        stats.crankbacks,
        stats.blocking_probability(),
    );
    for (code, n) in &stats.failed_by_error {
        println!("failed_by_error {code} {n}");
    }
    if let Some(path) = &args.stats_json {
        fs::write(path, serde_json::to_string_pretty(&stats)?)?;
        info!(path = %path.display(), "统计已写出");
    }
    Ok(())
}
