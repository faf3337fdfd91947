//! Exit codes and output streams of the `watchlist` binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_watchlist"))
        .args(args)
        .env_remove("WATCHLIST_OUT")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn watchlist");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for watchlist")
}

#[test]
fn test_empty_stdin_exits_zero() {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().to_string_lossy().to_string();
    let output = run_with_stdin(&["--out", &out], "");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_legacy_xlsx_out_and_json_summary() {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().join("watchlist_summary.xlsx");
    let output = run_with_stdin(
        &["--out", &out.to_string_lossy(), "--json"],
        "Date: 2024-02-08\nAAA,1.00,0.10,1.0%,0.90,1.10,0.80,1000,09:30\n",
    );
    assert!(output.status.success());
    assert!(dir.path().join("2024").join("february.xlsx").exists());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json summary");
    assert_eq!(summary["blocks_written"], 1);
}

#[test]
fn test_unreadable_month_exits_one() {
    let dir = TempDir::new().expect("tempdir");
    let garbage = dir.path().join("2024").join("february.xlsx");
    std::fs::create_dir_all(dir.path().join("2024")).expect("year dir");
    std::fs::write(&garbage, b"garbage").expect("write garbage");

    let out = dir.path().to_string_lossy().to_string();
    let output = run_with_stdin(
        &["--out", &out],
        "Date: 2024-02-08\nAAA,1.00,0.10,1.0%,0.90,1.10,0.80,1000,09:30\n",
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
}

#[test]
fn test_unwritable_archive_root_exits_one() {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().join("archive");
    std::fs::write(&root, b"a plain file").expect("write root file");

    let output = run_with_stdin(
        &["--out", &root.to_string_lossy(), "--json"],
        "Date: 2024-02-08\nAAA,1.00,0.10,1.0%,0.90,1.10,0.80,1000,09:30\n",
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_flat_layout_writes_to_root() {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().to_string_lossy().to_string();
    let output = run_with_stdin(
        &["--out", &out, "--flat"],
        "Date: 2024-02-08\nAAA,1.00,0.10,1.0%,0.90,1.10,0.80,1000,09:30\n",
    );
    assert!(output.status.success());
    assert!(dir.path().join("february.xlsx").exists());
}

#[test]
fn test_missing_out_is_usage_error() {
    let output = run_with_stdin(&[], "");
    assert!(!output.status.success());
}
