//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory
//! and checks stdout and the exit code.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str], stdin: Option<&str>) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pomodesk"))
        .args(args)
        .env("POMODESK_DATA_DIR", data_dir)
        .env("RUST_LOG", "warn")
        .env_remove("DBUS_SESSION_BUS_ADDRESS")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");

    {
        let mut pipe = child.stdin.take().expect("stdin");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).expect("write stdin");
        }
    }

    let output = child.wait_with_output().expect("Failed to wait for CLI");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.code().unwrap_or(-1), stdout, stderr)
}

fn json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).expect("valid JSON output")
}

#[test]
fn test_settings_list_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["settings", "list"], None);
    assert_eq!(code, 0);
    let settings = json(&stdout);
    assert_eq!(settings["workMinutes"], 25);
    assert_eq!(settings["shortBreakMinutes"], 5);
    assert_eq!(settings["sessionsBeforeLongBreak"], 4);
    assert_eq!(settings["postureRemindersEnabled"], false);
}

#[test]
fn test_settings_set_clamps_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["settings", "set", "workMinutes", "500"], None);
    assert_eq!(code, 0);
    let update = json(&stdout);
    assert_eq!(update["result"], "clamped");
    assert_eq!(update["applied"], 120);

    let (code, stdout, _) = run_cli(dir.path(), &["settings", "get", "workMinutes"], None);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "120");
}

#[test]
fn test_settings_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["settings", "get", "volume"], None);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_settings_reset() {
    let dir = tempfile::tempdir().unwrap();
    run_cli(dir.path(), &["settings", "set", "autoStart", "yes"], None);
    let (code, _, _) = run_cli(dir.path(), &["settings", "reset"], None);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["settings", "get", "autoStart"], None);
    assert_eq!(stdout.trim(), "false");
}

#[test]
fn test_stats_today_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["stats", "today"], None);
    assert_eq!(code, 0);
    let stats = json(&stdout);
    assert_eq!(stats["completedSessions"], 0);
    assert_eq!(stats["totalFocusMinutes"], 0);
}

#[test]
fn test_run_skip_records_work_session() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["run", "--json"], Some("s\nq\n"));
    assert_eq!(code, 0);
    assert!(stdout.contains("\"type\":\"SessionCompleted\""));

    let (_, stdout, _) = run_cli(dir.path(), &["stats", "today"], None);
    let stats = json(&stdout);
    assert_eq!(stats["completedSessions"], 1);
    assert_eq!(stats["totalFocusMinutes"], 25);

    let (_, stdout, _) = run_cli(dir.path(), &["stats", "reset"], None);
    assert_eq!(json(&stdout)["completedSessions"], 0);
}

#[test]
fn test_run_applies_settings_and_stats_reset() {
    let dir = tempfile::tempdir().unwrap();
    let input = "s\nreset-stats\nset workMinutes 50\ns\ns\nq\n";
    let (code, stdout, _) = run_cli(dir.path(), &["run", "--json"], Some(input));
    assert_eq!(code, 0);
    assert!(stdout.contains("\"type\":\"StatsReset\""));
    assert!(stdout.contains("\"type\":\"SettingsSaved\""));

    let (_, stdout, _) = run_cli(dir.path(), &["settings", "get", "workMinutes"], None);
    assert_eq!(stdout.trim(), "50");

    // Saving while idle restarts the cycle, so one 50-minute Work session counts.
    let (_, stdout, _) = run_cli(dir.path(), &["stats", "today"], None);
    let stats = json(&stdout);
    assert_eq!(stats["completedSessions"], 1);
    assert_eq!(stats["totalFocusMinutes"], 50);
}

#[test]
fn test_run_exits_on_end_of_input() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["run"], Some(""));
    assert_eq!(code, 0);
}

#[test]
fn test_alert_test_reports_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["alert", "test"], None);
    assert_eq!(code, 0);
    let report = json(&stdout);
    assert!(report.get("sound").is_some());
    assert!(report.get("notification").is_some());
    // No session bus in the test environment on Linux.
    if cfg!(target_os = "linux") {
        assert_eq!(report["permission"], "denied");
    }
}
