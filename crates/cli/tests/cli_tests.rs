//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const SECTIONS: &str = r#"<<<kube_node_count_v1:sep(0)>>>
{"worker":{"ready":2,"not_ready":1},"control_plane":{"ready":1,"not_ready":0}}
<<<<prod_deployment_shop_web>>>>
<<<kube_replicas_v1:sep(0)>>>
{"kind":"deployment","desired":3,"ready":2,"updated":3,"available":2}
<<<kube_update_strategy_v1:sep(0)>>>
{"strategy":{"type":"Recreate"}}
<<<<>>>>
"#;

fn kubemon(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kubemon"))
        .args(args)
        .env("KUBEMON_CLI_CONFIG", dir.join("absent-config.json"))
        .env("KUBEMON_STORE_DIR", dir.join("store"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

fn sections_file(dir: &TempDir) -> String {
    let path = dir.path().join("agent-output.txt");
    std::fs::write(&path, SECTIONS).unwrap();
    path.to_string_lossy().into_owned()
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    let output = kubemon(dir.path(), &["--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("check"), "Should show check command");
    assert!(stdout.contains("hosts"), "Should show hosts command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    let output = kubemon(dir.path(), &["--version"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("kubemon"), "Should show binary name");
}

#[test]
fn test_check_help_lists_checks() {
    let dir = TempDir::new().unwrap();
    let output = kubemon(dir.path(), &["check", "--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for name in [
        "pod-status",
        "pod-conditions",
        "replicas",
        "cronjob-status",
        "node-conditions",
        "node-count",
        "pvc",
        "resources",
    ] {
        assert!(stdout.contains(name), "Should show {name} check");
    }
}

#[test]
fn test_hosts_lists_piggyback_targets() {
    let dir = TempDir::new().unwrap();
    let sections = sections_file(&dir);

    let output = kubemon(dir.path(), &["hosts", "--sections", &sections, "--format", "json"]);

    assert!(output.status.success());
    let hosts: Value = serde_json::from_slice(&output.stdout).unwrap();
    let hosts = hosts.as_array().unwrap();
    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0]["host"], "<cluster>");
    assert_eq!(hosts[0]["names"], "kube_node_count_v1");
    assert_eq!(hosts[1]["host"], "prod_deployment_shop_web");
    assert_eq!(hosts[1]["sections"], 2);
}

#[test]
fn test_replicas_check_tracks_duration_across_runs() {
    let dir = TempDir::new().unwrap();
    let sections = sections_file(&dir);
    let args = |now: &'static str| {
        vec![
            "check".to_string(),
            "replicas".to_string(),
            "--sections".to_string(),
            sections.clone(),
            "--host".to_string(),
            "prod_deployment_shop_web".to_string(),
            "--now".to_string(),
            now.to_string(),
            "--format".to_string(),
            "json".to_string(),
        ]
    };

    let first_args = args("1000");
    let first_args: Vec<&str> = first_args.iter().map(String::as_str).collect();
    let first = kubemon(dir.path(), &first_args);
    assert_eq!(first.status.code(), Some(0));
    let report: Value = serde_json::from_slice(&first.stdout).unwrap();
    assert_eq!(report["check"], "kube_replicas");
    assert_eq!(report["state"], "OK");
    assert_eq!(report["outputs"][0]["text"], "Ready: 2/3");

    let second_args = args("1700");
    let second_args: Vec<&str> = second_args.iter().map(String::as_str).collect();
    let second = kubemon(dir.path(), &second_args);
    assert_eq!(second.status.code(), Some(2));
    let report: Value = serde_json::from_slice(&second.stdout).unwrap();
    assert_eq!(report["state"], "CRIT");
    let texts: Vec<&str> = report["outputs"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|output| output["text"].as_str())
        .collect();
    assert!(
        texts.iter().any(|text| text.starts_with("Not ready for: 11 minutes 40 seconds")),
        "unexpected outputs: {texts:?}"
    );
}

#[test]
fn test_node_count_check_on_cluster_host() {
    let dir = TempDir::new().unwrap();
    let sections = sections_file(&dir);
    let params = dir.path().join("params.json");
    std::fs::write(
        &params,
        r#"{"worker_levels_lower":{"type":"fixed","warn":3,"crit":1}}"#,
    )
    .unwrap();

    let output = kubemon(
        dir.path(),
        &[
            "check",
            "node-count",
            "--sections",
            &sections,
            "--params",
            &params.to_string_lossy(),
            "--format",
            "json",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["check"], "kube_node_count");
    assert_eq!(report["state"], "WARN");
    assert_eq!(
        report["outputs"][0]["text"],
        "Worker nodes 2/3 (warn/crit below 3/1)"
    );
    assert_eq!(report["outputs"][1]["text"], "Control plane nodes 1/1");
}

#[test]
fn test_unknown_host_fails() {
    let dir = TempDir::new().unwrap();
    let sections = sections_file(&dir);

    let output = kubemon(
        dir.path(),
        &["check", "replicas", "--sections", &sections, "--host", "prod_node_missing"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("prod_node_missing"));
}

#[test]
fn test_missing_section_fails() {
    let dir = TempDir::new().unwrap();
    let sections = sections_file(&dir);

    let output = kubemon(
        dir.path(),
        &["check", "pod-status", "--sections", &sections, "--host", "prod_deployment_shop_web"],
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
