use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn overseer(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("overseer").unwrap();
    cmd.env("OVERSEER_SETTINGS", home.join("settings.toml"))
        .env_remove("OVERSEER_CONFIG")
        .env_remove("OVERSEER_LOG")
        .arg("--no-color");
    cmd
}

/// Write a target binary and a configuration pointing at it.
fn fixture(dir: &Path, static_tools: &str, run: bool) -> PathBuf {
    let target = dir.join("sample.exe");
    std::fs::write(&target, b"hello world").unwrap();

    let config = serde_json::json!({
        "paths": {
            "analysis": dir.join("analysis"),
            "tools": dir.join("tools"),
            "binary": dir.join("binary"),
            "utils": dir.join("utils"),
            "desktop": dir.join("desktop"),
        },
        "static_tools": serde_json::from_str::<serde_json::Value>(static_tools).unwrap(),
        "dynamic_tools": {},
        "binary": { "path": target, "run": run },
    });
    let path = dir.join("overseer.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    overseer(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("report"));
}

#[test]
fn test_plan_requires_config() {
    let home = TempDir::new().unwrap();
    overseer(home.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Analysis configuration required"));
}

#[test]
fn test_plan_rejects_missing_binary() {
    let home = TempDir::new().unwrap();
    let config = fixture(home.path(), "{}", false);
    std::fs::remove_file(home.path().join("sample.exe")).unwrap();

    overseer(home.path())
        .args(["plan", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not an existing file"));
}

#[test]
fn test_plan_json_marks_unknown_tools() {
    let home = TempDir::new().unwrap();
    let config = fixture(home.path(), r#"{"Capa": true, "Bogus": true, "Yara": false}"#, false);

    let output = overseer(home.path())
        .args(["-o", "json", "plan", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let invocations = plan["static_invocations"].as_array().unwrap();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0]["tool"], "Capa");
    assert_eq!(invocations[1]["tool"], "Bogus");
    assert_eq!(invocations[1]["skip"], "unknown-tool");
    assert_eq!(plan["target"]["run"], false);
}

#[test]
fn test_run_with_nothing_enabled_writes_reports() {
    let home = TempDir::new().unwrap();
    let config = fixture(home.path(), "{}", false);

    let output = overseer(home.path())
        .args(["-o", "json", "run", "--report", "json,md", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["result"]["status"], "complete");
    assert_eq!(summary["result"]["binary"]["name"], "sample.exe");
    assert_eq!(summary["reports"].as_array().unwrap().len(), 2);

    let reports: Vec<_> = std::fs::read_dir(home.path().join("analysis/reports"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(reports.len(), 2);
    assert!(home.path().join("binary/sample.exe").is_file());
}

#[test]
fn test_run_rejects_unknown_report_format_before_launch() {
    let home = TempDir::new().unwrap();
    let config = fixture(home.path(), "{}", false);

    overseer(home.path())
        .args(["run", "--report", "pdf", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported report format"));

    assert!(!home.path().join("analysis").exists());
}

#[test]
fn test_report_rerenders_saved_result() {
    let home = TempDir::new().unwrap();
    let config = fixture(home.path(), "{}", false);

    overseer(home.path())
        .args(["-o", "json", "run", "--report", "json", "--config"])
        .arg(&config)
        .assert()
        .success();

    let saved = std::fs::read_dir(home.path().join("analysis/reports"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .next()
        .unwrap();
    let out = home.path().join("rendered");

    overseer(home.path())
        .arg("report")
        .arg(&saved)
        .args(["--format", "html"])
        .arg("--dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let html = std::fs::read_dir(&out).unwrap().next().unwrap().unwrap().path();
    let content = std::fs::read_to_string(html).unwrap();
    assert!(content.contains("Malware Analysis Report - sample.exe"));
}

#[test]
fn test_report_unsupported_format() {
    let home = TempDir::new().unwrap();
    overseer(home.path())
        .args(["report", "missing.json", "--format", "pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported report format: \"pdf\""));
}

#[test]
fn test_tools_unknown_name() {
    let home = TempDir::new().unwrap();
    overseer(home.path())
        .args(["tools", "--tool", "Ghidra"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown tool: Ghidra"));
}

#[test]
fn test_tools_custom_path() {
    let home = TempDir::new().unwrap();
    let capa = home.path().join("my-capa");
    std::fs::write(&capa, b"").unwrap();

    let output = overseer(home.path())
        .args(["-o", "json", "tools", "--tool", "capa", "--path"])
        .arg(&capa)
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["tool"], "Capa");
    assert_eq!(rows[0]["found"], true);
    assert_eq!(rows[0]["path"], capa.display().to_string());
}

#[test]
fn test_settings_set_and_show() {
    let home = TempDir::new().unwrap();

    overseer(home.path())
        .args(["settings", "set", "max_parallel", "3"])
        .assert()
        .success();

    overseer(home.path())
        .args(["-o", "json", "settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"max_parallel\": 3"));

    overseer(home.path())
        .args(["settings", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settings.toml"));
}

#[test]
fn test_settings_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    overseer(home.path())
        .args(["settings", "set", "colour", "on"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown settings key"));
}
