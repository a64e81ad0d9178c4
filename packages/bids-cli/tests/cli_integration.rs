use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn bidscat() -> Command {
    let mut cmd = Command::cargo_bin("bidscat").unwrap();
    cmd.env_remove("BIDS_CATALOG_SKIP_MARKER")
        .env_remove("BIDS_CATALOG_PARALLEL")
        .env_remove("BIDS_CATALOG_CONFIG");
    cmd
}

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

/// Three subjects with a raw and a cleaned recording each, plus an empty config
fn dataset() -> (TempDir, String) {
    let tmp = tempfile::tempdir().unwrap();
    for subject in ["001", "002", "003"] {
        let dir = format!("data/sub-{subject}/ses-01/eeg");
        touch(
            tmp.path(),
            &format!("{dir}/sub-{subject}_ses-01_task-rest_run-01_eeg.vhdr"),
        );
        touch(
            tmp.path(),
            &format!("{dir}/sub-{subject}_ses-01_task-rest_acq-alt_run-01_desc-clean_eeg.vhdr"),
        );
    }
    let config = tmp.path().join("config.json");
    fs::write(&config, "{}").unwrap();
    (tmp, config.display().to_string())
}

fn root(tmp: &TempDir) -> String {
    tmp.path().join("data").display().to_string()
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    serde_json::from_str(&stdout).unwrap()
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    bidscat()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    bidscat()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bidscat"));
}

// =============================================================================
// SCAN SUBCOMMAND
// =============================================================================

#[test]
fn test_scan_summary() {
    let (tmp, config) = dataset();
    bidscat()
        .args(["scan", "--root", root(&tmp).as_str(), "--config", config.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Subjects: 3 (001, 002, 003)"))
        .stdout(predicate::str::contains("Files: 6"));
}

#[test]
fn test_scan_with_entity_flags() {
    let (tmp, config) = dataset();
    bidscat()
        .args(["scan", "--root", root(&tmp).as_str(), "--config", config.as_str()])
        .args(["--subject", "sub-002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Subjects: 1 (002)"))
        .stdout(predicate::str::contains("Files: 2"));
}

#[test]
fn test_scan_json_lists_errors() {
    let (tmp, config) = dataset();
    touch(
        tmp.path(),
        "data/sub-001/ses-01/eeg/sub-001_ses-01_echo-1_eeg.vhdr",
    );

    let output = bidscat()
        .args(["scan", "--root", root(&tmp).as_str(), "--config", config.as_str(), "--json"])
        .assert()
        .success();

    let parsed = stdout_json(output.get_output());
    assert_eq!(parsed["summary"]["files"], 6);
    assert_eq!(parsed["summary"]["errors"]["decode"], 1);
    assert_eq!(parsed["errors"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["errors"][0]["kind"], "decode");
}

#[test]
fn test_scan_strict_dirty_dataset() {
    let (tmp, config) = dataset();
    touch(
        tmp.path(),
        "data/sub-001/ses-01/eeg/sub-002_ses-01_task-rest_eeg.vhdr",
    );

    bidscat()
        .args(["scan", "--root", root(&tmp).as_str(), "--config", config.as_str(), "--strict"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("invalid file"));
}

#[test]
fn test_scan_missing_root() {
    let (tmp, config) = dataset();
    bidscat()
        .args(["scan", "--config", config.as_str(), "--root"])
        .arg(tmp.path().join("nope"))
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_scan_bad_config() {
    let (tmp, _) = dataset();
    let config = tmp.path().join("broken.json");
    fs::write(&config, "{ nope").unwrap();

    bidscat()
        .args(["scan", "--root", root(&tmp).as_str(), "--config"])
        .arg(&config)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_scan_skip_marker_from_env() {
    let (tmp, config) = dataset();
    touch(
        tmp.path(),
        "data/sub-001/ses-01/eeg/sub-001_ses-01_task-rest_IGNORE_eeg.vhdr",
    );

    bidscat()
        .args(["scan", "--root", root(&tmp).as_str(), "--config", config.as_str()])
        .env("BIDS_CATALOG_SKIP_MARKER", "_IGNORE")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files: 6"))
        .stdout(predicate::str::contains("Errors").not());
}

// =============================================================================
// SELECT SUBCOMMAND
// =============================================================================

#[test]
fn test_select_prints_paths() {
    let (tmp, config) = dataset();
    let output = bidscat()
        .args(["select", "--root", root(&tmp).as_str(), "--config", config.as_str()])
        .args(["--where", "subject=001,002"])
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|l| !l.contains("sub-003")));
}

#[test]
fn test_select_with_exclude() {
    let (tmp, config) = dataset();
    let output = bidscat()
        .args(["select", "--root", root(&tmp).as_str(), "--config", config.as_str()])
        .args(["--where", "subject=00*", "--exclude", "description=clean"])
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 3);
    assert!(!stdout.contains("desc-clean"));
}

#[test]
fn test_select_json_to_file() {
    let (tmp, config) = dataset();
    let out = tmp.path().join("selection.json");

    bidscat()
        .args(["select", "--root", root(&tmp).as_str(), "--config", config.as_str()])
        .args(["--where", "description=clean", "--json", "--compact", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote 3 file(s)"));

    let content = fs::read_to_string(&out).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records
        .iter()
        .all(|r| r["entities"]["description"] == "clean"));
}

#[test]
fn test_select_invalid_key() {
    let (tmp, config) = dataset();
    bidscat()
        .args(["select", "--root", root(&tmp).as_str(), "--config", config.as_str()])
        .args(["--where", "subjects=001"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Invalid selection key 'subjects'"));
}

#[test]
fn test_select_malformed_range() {
    let (tmp, config) = dataset();
    bidscat()
        .args(["select", "--root", root(&tmp).as_str(), "--config", config.as_str()])
        .args(["--where", "run=5-2"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Malformed range"));
}

#[test]
fn test_select_bad_criterion_syntax() {
    let (tmp, config) = dataset();
    bidscat()
        .args(["select", "--root", root(&tmp).as_str(), "--config", config.as_str()])
        .args(["--where", "subject"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("column=value"));
}

// =============================================================================
// CHECK SUBCOMMAND
// =============================================================================

#[test]
fn test_check_valid_path() {
    bidscat()
        .args(["check", "/data/sub-001/ses-01/eeg/sub-001_ses-01_task-rest_eeg.vhdr"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("task: rest"));
}

#[test]
fn test_check_reports_every_violation() {
    bidscat()
        .args(["check", "/data/subj01/ses-02/eeg/sub-09_ses-03_foo_eeg.vhdr"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("1. subject directory 'subj01'"))
        .stderr(predicate::str::contains("token 'foo'"))
        .stderr(predicate::str::contains("session '03'"));
}

#[test]
fn test_check_json() {
    let output = bidscat()
        .args(["check", "--json", "sub-01/ses-01/eeg/sub-01_ses-01_echo-2_eeg.vhdr"])
        .assert()
        .failure()
        .code(3);

    let parsed = stdout_json(output.get_output());
    assert_eq!(parsed["valid"], false);
    assert!(parsed["entities"].is_null());
    assert!(parsed["decode_error"]
        .as_str()
        .unwrap()
        .contains("unknown entity key 'echo'"));
    assert_eq!(parsed["violations"].as_array().unwrap().len(), 1);
}
