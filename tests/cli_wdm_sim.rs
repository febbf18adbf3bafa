use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "wdmsim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn wdm_sim(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wdm_sim"))
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("run wdm_sim")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "wdm_sim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn summary_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find(|line| line.starts_with("summary "))
        .expect("summary line")
        .to_string()
}

const RING_SCENARIO: &str = r#"
{
    "schema_version": 1,
    "topology": { "kind": "ring", "nodes": 4 },
    "links": { "wavelengths": 2 },
    "traffic": [
        { "kind": "scripted", "requests": [
            { "at_s": 0.0, "source": 0, "target": 2, "duration_s": 1.0 },
            { "at_s": 0.0, "source": 0, "target": 2, "duration_s": 1.0 },
            { "at_s": 0.0, "source": 0, "target": 2, "duration_s": 1.0 }
        ] }
    ]
}
"#;

#[test]
fn wdm_sim_prints_summary_and_writes_stats_json() {
    let dir = unique_temp_dir("stats");
    let scenario = write_file(&dir, "scenario.json", RING_SCENARIO);
    let stats_json = dir.join("stats.json");

    let output = wdm_sim(&[
        "--scenario",
        scenario.to_str().unwrap(),
        "--stats-json",
        stats_json.to_str().unwrap(),
    ]);
    assert_success(&output);

    let summary = summary_line(&output);
    assert!(summary.contains("reason=Drained"), "{summary}");
    assert!(summary.contains("requests=3"), "{summary}");

    let raw = fs::read_to_string(&stats_json).expect("read stats.json");
    let v: Value = serde_json::from_str(&raw).expect("parse stats.json");
    assert_eq!(v.get("requests").and_then(Value::as_u64), Some(3));
    // 两个波长、两条候选路径：三个同时到达的请求都能建立
    assert_eq!(v.get("established").and_then(Value::as_u64), Some(3));
    assert_eq!(v.get("removed").and_then(Value::as_u64), Some(3));
    assert_eq!(v.get("failed").and_then(Value::as_u64), Some(0));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn wdm_sim_reroute_override_disables_retries() {
    let dir = unique_temp_dir("reroute-none");
    let scenario = write_file(
        &dir,
        "scenario.json",
        r#"
{
    "schema_version": 1,
    "topology": { "kind": "ring", "nodes": 4 },
    "links": { "wavelengths": 1 },
    "traffic": [
        { "kind": "scripted", "requests": [
            { "at_s": 0.0, "source": 0, "target": 2, "duration_s": 1.0 },
            { "at_s": 0.0, "source": 0, "target": 2, "duration_s": 1.0 }
        ] }
    ]
}
        "#,
    );

    let output = wdm_sim(&["--scenario", scenario.to_str().unwrap(), "--reroute", "none"]);
    assert_success(&output);
    let summary = summary_line(&output);
    assert!(summary.contains("established=1"), "{summary}");
    assert!(summary.contains("failed=1"), "{summary}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout
            .lines()
            .any(|line| line.starts_with("failed_by_error ADMISSION_CONTROL_FAILURE 1")),
        "{stdout}"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn wdm_sim_restores_from_snapshot_to_the_same_result() {
    let dir = unique_temp_dir("restore");
    let scenario = write_file(
        &dir,
        "scenario.json",
        r#"
{
    "schema_version": 1,
    "topology": { "kind": "nsfnet" },
    "links": { "wavelengths": 4 },
    "protocol": { "reroute": "segment" },
    "traffic": [
        { "kind": "poisson", "arrival_rate": 20.0, "mean_holding_s": 0.5, "requests": 40, "seed": 3 }
    ],
    "failures": [ { "kind": "link", "at_s": 0.7, "a": 4, "b": 6 } ],
    "snapshots": [ { "at_s": 0.5, "name": "mid" } ]
}
        "#,
    );
    let snap_dir = dir.join("snapshots");

    let first = wdm_sim(&[
        "--scenario",
        scenario.to_str().unwrap(),
        "--snapshot-dir",
        snap_dir.to_str().unwrap(),
    ]);
    assert_success(&first);
    let snapshot = snap_dir.join("mid.json");
    assert!(snapshot.exists(), "snapshot was not written");

    let resumed = wdm_sim(&["--restore", snapshot.to_str().unwrap()]);
    assert_success(&resumed);
    assert_eq!(summary_line(&first), summary_line(&resumed));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn wdm_sim_rejects_bad_arguments() {
    let dir = unique_temp_dir("bad-args");
    let scenario = write_file(&dir, "scenario.json", RING_SCENARIO);

    let output = wdm_sim(&["--scenario", scenario.to_str().unwrap(), "--reroute", "sideways"]);
    assert!(!output.status.success());

    let output = wdm_sim(&[]);
    assert!(!output.status.success());

    let bad = write_file(
        &dir,
        "bad.json",
        r#"{ "schema_version": 9, "topology": { "kind": "nsfnet" } }"#,
    );
    let output = wdm_sim(&["--scenario", bad.to_str().unwrap()]);
    assert!(!output.status.success());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn wdm_sim_accepts_protocol_value_enums() {
    let dir = unique_temp_dir("value-enum");
    let scenario = write_file(&dir, "scenario.json", RING_SCENARIO);
    let scenario = scenario.to_str().unwrap();

    for (reroute, policy) in [
        ("segment", "least_used"),
        ("end_to_end", "most_used"),
        ("e2e", "first_fit"),
        ("crankback", "first_fit"),
    ] {
        let output = wdm_sim(&["--scenario", scenario, "--reroute", reroute, "--policy", policy]);
        assert_success(&output);
        assert!(summary_line(&output).contains("requests=3"));
    }

    let output = wdm_sim(&["--scenario", scenario, "--policy", "best_fit"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("least_used"), "{stderr}");

    let snapshot = write_file(&dir, "snap.json", "{}");
    let output = wdm_sim(&["--restore", snapshot.to_str().unwrap(), "--reroute", "none"]);
    assert!(!output.status.success());

    let _ = fs::remove_dir_all(&dir);
}
