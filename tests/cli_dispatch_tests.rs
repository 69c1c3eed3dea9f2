use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_catsim")
}

fn unique_temp_path(name: &str, extension: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("catsim-{name}-{stamp}.{extension}"))
}

fn write_scenario(name: &str, body: &str) -> PathBuf {
    let path = unique_temp_path(name, "yaml");
    fs::write(&path, body).expect("scenario should be written");
    path
}

#[test]
fn missing_or_unknown_command_is_a_usage_error() {
    let output = Command::new(bin()).output().expect("catsim should run");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage"));

    let output = Command::new(bin())
        .arg("optimize")
        .output()
        .expect("catsim should run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn bad_flag_is_a_usage_error() {
    let output = Command::new(bin())
        .args(["simulate", "--replicates", "lots"])
        .output()
        .expect("simulate should run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn presets_command_lists_every_trinket() {
    let output = Command::new(bin())
        .arg("presets")
        .output()
        .expect("presets should run");

    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("presets should emit json");
    let presets = payload.as_array().expect("presets should be an array");
    assert_eq!(presets.len(), 9);
    assert!(presets
        .iter()
        .any(|p| p["config"]["name"] == "dragonspine_trophy"));
}

#[test]
fn simulate_command_emits_a_summary() {
    let scenario = write_scenario("simulate", "encounter:\n  fight_length: 30\n");
    let output = Command::new(bin())
        .arg("simulate")
        .arg(&scenario)
        .args(["--replicates", "25", "--seed", "4"])
        .output()
        .expect("simulate should run");
    let _ = fs::remove_file(&scenario);

    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("simulate should emit json");
    assert_eq!(payload["replicates"], 25);
    assert!(payload["dps"]["mean"].as_f64().unwrap() > 0.0);
    assert_eq!(payload["dps_values"].as_array().map(Vec::len), Some(25));
}

#[test]
fn simulate_command_writes_trial_csv() {
    let scenario = write_scenario("csv", "encounter:\n  fight_length: 20\n");
    let csv_path = unique_temp_path("trials", "csv");
    let output = Command::new(bin())
        .arg("simulate")
        .arg(&scenario)
        .args(["--replicates", "6", "--table", "--csv"])
        .arg(&csv_path)
        .output()
        .expect("simulate should run");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("replicates\tseed\tmean_dps"));

    let csv = fs::read_to_string(&csv_path).expect("csv should be written");
    let _ = fs::remove_file(&scenario);
    let _ = fs::remove_file(&csv_path);
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("trial,fight_length,total_damage,dps,time_to_oom")
    );
    assert_eq!(lines.count(), 6);
}

#[test]
fn trace_command_emits_events_and_timeline() {
    let scenario = write_scenario("trace", "encounter:\n  fight_length: 15\nseed: 3\n");
    let output = Command::new(bin())
        .arg("trace")
        .arg(&scenario)
        .output()
        .expect("trace should run");
    let _ = fs::remove_file(&scenario);

    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("trace should emit json");
    assert!(!payload["events"].as_array().unwrap().is_empty());
    assert!(!payload["timeline"].as_array().unwrap().is_empty());
    assert_eq!(payload["result"]["fight_length"], 15.0);
}

#[test]
fn weights_command_refuses_small_runs() {
    let scenario = write_scenario("weights", "encounter:\n  fight_length: 10\n");
    let output = Command::new(bin())
        .arg("weights")
        .arg(&scenario)
        .args(["--replicates", "50"])
        .output()
        .expect("weights should run");
    let _ = fs::remove_file(&scenario);

    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("weights should emit json");
    assert_eq!(payload["status"], "not_computed");
    assert_eq!(payload["requested"], 50);
}

#[test]
fn validate_command_accepts_good_and_rejects_bad_scenarios() {
    let good = write_scenario("valid", "trinkets: [bloodlust_brooch]\n");
    let output = Command::new(bin())
        .arg("validate")
        .arg(&good)
        .output()
        .expect("validate should run");
    let _ = fs::remove_file(&good);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("scenario valid"));

    let bad = write_scenario("invalid", "encounter:\n  debuffs: [mortal_strike]\n");
    let output = Command::new(bin())
        .arg("validate")
        .arg(&bad)
        .output()
        .expect("validate should run");
    let _ = fs::remove_file(&bad);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("mortal_strike"));
}

#[test]
fn missing_scenario_file_exits_with_failure() {
    let output = Command::new(bin())
        .args(["simulate", "/definitely/not/here.yaml"])
        .output()
        .expect("simulate should run");
    assert_eq!(output.status.code(), Some(1));
}
