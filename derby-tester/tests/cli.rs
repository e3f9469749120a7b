use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "derby-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_derby-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("smoke"));
    std::fs::remove_file(output_path).ok();
}

#[test]
fn cli_runs_smoke_and_writes_json_report() {
    let exe = env!("CARGO_BIN_EXE_derby-tester");
    let output_path = temp_path("json");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "smoke,favorite-ledger",
            "--iterations",
            "1",
            "--seeds",
            "1,2",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Derby Automated Tester"));

    let report = std::fs::read_to_string(&output_path).expect("read report");
    let parsed: serde_json::Value = serde_json::from_str(&report).expect("json report");
    let results = parsed.as_array().expect("array of results");
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r["passed"] == true));
    std::fs::remove_file(output_path).ok();
}

#[test]
fn cli_realtime_mode_persists_players() {
    let exe = env!("CARGO_BIN_EXE_derby-tester");
    let save_dir = temp_path("saves");
    let output_path = temp_path("csv");
    let output = Command::new(exe)
        .args([
            "--mode",
            "realtime",
            "--tick-ms",
            "1",
            "--report",
            "csv",
            "--scenarios",
            "longshot",
            "--iterations",
            "1",
            "--seeds",
            "5",
            "--save-dir",
        ])
        .arg(&save_dir)
        .arg("--output")
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let csv = std::fs::read_to_string(&output_path).expect("read csv");
    assert!(csv.lines().nth(1).is_some_and(|line| line.contains(",realtime,true,")));
    assert!(save_dir.join("longshot-5.json").exists());
    std::fs::remove_dir_all(save_dir).ok();
    std::fs::remove_file(output_path).ok();
}

#[test]
fn cli_rejects_bad_seed() {
    let exe = env!("CARGO_BIN_EXE_derby-tester");
    let output = Command::new(exe)
        .args(["--seeds", "not-a-seed", "--iterations", "1"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not-a-seed"));
}
