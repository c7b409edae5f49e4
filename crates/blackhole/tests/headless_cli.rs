use std::fs;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn blackhole(config_dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_blackhole"))
        .env("BLACKHOLE_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run blackhole")
}

fn json_stdout(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "blackhole failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn headless_run_reports_json_stats() {
    let root = TempDir::new().unwrap();
    let output = blackhole(
        root.path(),
        &[
            "headless",
            "--ticks",
            "90",
            "--dt",
            "0.016",
            "--json",
            "--particles",
            "400",
            "--seed",
            "21",
        ],
    );
    let report = json_stdout(&output);

    assert_eq!(report["ticks"], 90);
    assert_eq!(report["frames_drawn"], 90);
    assert_eq!(report["config"]["particle_count"], 400);
    assert_eq!(report["stats"]["particle_count"], 400);
    assert_eq!(report["stats"]["device"]["state"], "active");
    assert_eq!(report["field"]["count"], 400);
    assert!(report["field"]["min_distance"].as_f64().unwrap() >= 1.0);
}

#[test]
fn scene_file_from_config_dir_is_layered_under_flags() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("scene.toml"),
        r#"
[simulation]
particle_count = 250
bloom_strength = "bright"
performance_mode = "low"
"#,
    )
    .unwrap();

    let output = blackhole(
        root.path(),
        &["config", "--json", "--set", "disk_rotation_speed=99"],
    );
    let summary = json_stdout(&output);

    assert_eq!(summary["simulation"]["particle_count"], 250);
    assert_eq!(summary["simulation"]["bloom_strength"], 0.0);
    assert_eq!(summary["simulation"]["disk_rotation_speed"], 5.0);
    assert_eq!(summary["simulation"]["performance_mode"], "low");
    assert!(summary["source"]
        .as_str()
        .unwrap()
        .ends_with("scene.toml"));
}

#[test]
fn invalid_scene_file_fails_with_a_message() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("scene.toml"),
        "[geometry]\nevent_horizon_radius = 10.0\n",
    )
    .unwrap();

    let output = blackhole(root.path(), &["headless", "--ticks", "1"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("scene config"), "stderr: {stderr}");
}

#[test]
fn unknown_override_key_fails() {
    let root = TempDir::new().unwrap();
    let output = blackhole(root.path(), &["headless", "--ticks", "1", "--set", "gravity=2"]);
    assert!(!output.status.success());
}

#[test]
fn out_of_range_durations_fail_cleanly() {
    let root = TempDir::new().unwrap();
    for args in [
        ["headless", "--ticks", "1", "--dt", "1e20"],
        ["headless", "--ticks", "1", "--frame-ms", "1e300"],
    ] {
        let output = blackhole(root.path(), &args);
        assert!(!output.status.success(), "{args:?} succeeded");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("out of range"), "stderr: {stderr}");
        assert!(!stderr.contains("panicked"), "stderr: {stderr}");
    }
}
