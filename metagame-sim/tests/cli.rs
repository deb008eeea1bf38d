use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "metagame-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_lists_demo_archetypes() {
    let exe = env!("CARGO_BIN_EXE_metagame-sim");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-archetypes", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Archetypes in Three-deck demo"));
    assert!(content.contains("Midrange"));
}

#[test]
fn cli_writes_json_report_for_each_seed() {
    let exe = env!("CARGO_BIN_EXE_metagame-sim");
    let output_path = temp_path("json");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--seeds",
            "1,2",
            "--trials",
            "3",
            "--field",
            "exact",
            "--players",
            "16",
            "--exact",
            "--parallel",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let value: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let batches = value.as_array().expect("array of batches");
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0]["batch_seed"], 1);
    assert_eq!(batches[1]["batch_seed"], 2);
    assert_eq!(batches[0]["players"], 16);
    assert_eq!(batches[0]["completed"], 3);
}

#[test]
fn cli_reads_scenario_file() {
    let exe = env!("CARGO_BIN_EXE_metagame-sim");
    let scenario_path = temp_path("scenario.json");
    std::fs::write(
        &scenario_path,
        r#"{
            "name": "Rock paper scissors",
            "archetypes": {"Rock": {"": 4}, "Paper": {"": 4}, "Scissors": {"": 4}},
            "matchups": {
                "Rock": {"": {"Scissors": {"": 0.9}}},
                "Paper": {"": {"Rock": {"": 0.9}}},
                "Scissors": {"": {"Paper": {"": 0.9}}}
            },
            "tournament": {"top_cut": 4},
            "monte_carlo": {"trials": 5}
        }"#,
    )
    .expect("write scenario");
    let output_path = temp_path("rps.csv");
    let output = Command::new(exe)
        .args(["--report", "csv", "--scenario"])
        .arg(&scenario_path)
        .arg("--output")
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Rock paper scissors,1337,archetype,Rock"));
    assert_eq!(content.lines().count(), 7);
}

#[test]
fn cli_rejects_missing_scenario() {
    let exe = env!("CARGO_BIN_EXE_metagame-sim");
    let output = Command::new(exe)
        .args(["--scenario", "/nonexistent/metagame.json"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"));
}

#[test]
fn cli_rejects_unknown_report_format() {
    let exe = env!("CARGO_BIN_EXE_metagame-sim");
    let output = Command::new(exe)
        .args(["--report", "xml"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
}
