//! Integration tests for the grc CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a grc command acting as `user`
fn grc_as(tmp: &TempDir, user: &str) -> Command {
    let mut cmd = Command::cargo_bin("grc").unwrap();
    cmd.current_dir(tmp.path())
        .env("GRC_USER", user)
        .env_remove("GRC_SNAPSHOT_STORE")
        .env_remove("GRC_ORGANIZATION");
    cmd
}

fn grc(tmp: &TempDir) -> Command {
    grc_as(tmp, "alice")
}

/// Helper to create an initialized workspace
fn setup_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    grc(&tmp).arg("init").assert().success();
    tmp
}

/// Workspace with one framework seeded and alice as owner
fn setup_seeded() -> TempDir {
    let tmp = setup_workspace();
    grc(&tmp)
        .args(["member", "add", "alice", "--role", "owner"])
        .assert()
        .success();
    grc(&tmp)
        .args(["seed", "--framework", "GDPR"])
        .assert()
        .success();
    tmp
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8_lossy(&output.stdout).to_string()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    Command::cargo_bin("grc")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compliance"))
        .stdout(predicate::str::contains("board"));
}

#[test]
fn test_version_displays() {
    Command::cargo_bin("grc")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("grc"));
}

#[test]
fn test_commands_outside_workspace_fail() {
    let tmp = TempDir::new().unwrap();
    grc(&tmp)
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("grc init"));
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_creates_workspace() {
    let tmp = TempDir::new().unwrap();
    grc(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("grc seed"));

    assert!(tmp.path().join(".grc").is_dir());
    assert!(tmp.path().join(".grc/grc.db").is_file());
    assert!(tmp.path().join(".grc/config.yaml").is_file());
    assert!(tmp.path().join(".grc/catalogs").is_dir());
}

#[test]
fn test_init_twice_hints_force() {
    let tmp = setup_workspace();
    grc(&tmp)
        .arg("init")
        .assert()
        .stdout(predicate::str::contains("--force"));
}

// ============================================================================
// Seed and Framework Tests
// ============================================================================

#[test]
fn test_seed_list_shows_all_catalogs() {
    let tmp = setup_workspace();
    let out = stdout_of(grc(&tmp).args(["seed", "--list"]));
    for code in [
        "ISO27001", "GDPR", "HIPAA", "PCIDSS", "NISTCSF", "DORA", "NIS2", "SOC2", "ISO9001",
        "ISO22301",
    ] {
        assert!(out.contains(code), "missing {} in:\n{}", code, out);
    }
}

#[test]
fn test_seed_all_is_idempotent() {
    let tmp = setup_workspace();
    grc(&tmp)
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 10 framework(s), 10 changed"));

    grc(&tmp)
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 10 framework(s), 0 changed"))
        .stdout(predicate::str::contains("unchanged"));
}

#[test]
fn test_seed_json_reports() {
    let tmp = setup_workspace();
    let out = stdout_of(grc(&tmp).args(["seed", "-F", "NIS2", "-f", "json"]));
    let reports: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(reports[0]["code"], "NIS2");
    assert_eq!(reports[0]["outcome"], "created");
    assert!(reports[0]["controls"].as_u64().unwrap() > 0);
}

#[test]
fn test_seed_unknown_framework_fails() {
    let tmp = setup_workspace();
    grc(&tmp)
        .args(["seed", "--framework", "SOX"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SOX"));
}

#[test]
fn test_seed_custom_catalog() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join(".grc/catalogs/acme.yaml"),
        r#"
code: ACME
name: Acme Internal Standard
version: "1"
clauses:
  - ref: "1"
    title: Access
    controls:
      - ref: "1.1"
        title: Quarterly access review
"#,
    )
    .unwrap();

    grc(&tmp)
        .args(["seed", "--custom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ACME"));

    grc(&tmp)
        .args(["framework", "tree", "ACME"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quarterly access review"));
}

#[test]
fn test_framework_list_empty() {
    let tmp = setup_workspace();
    grc(&tmp)
        .args(["framework", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No frameworks seeded"));
}

#[test]
fn test_framework_list_and_tree() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["framework", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GDPR"));

    grc(&tmp)
        .args(["framework", "tree", "GDPR"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rights of the data subject"))
        .stdout(predicate::str::contains("Right to erasure"));

    grc(&tmp)
        .args(["framework", "show", "GDPR", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"code\": \"GDPR\""));
}

// ============================================================================
// Control Tests
// ============================================================================

#[test]
fn test_control_implement_and_show() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args([
            "control",
            "implement",
            "GDPR:Art.30",
            "--status",
            "implemented",
            "--evidence",
            "ropa.xlsx",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("GDPR:Art.30 is now implemented"));

    grc(&tmp)
        .args(["control", "show", "GDPR:Art.30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Records of processing activities"))
        .stdout(predicate::str::contains("ropa.xlsx"));

    grc(&tmp)
        .args(["control", "list", "-F", "GDPR", "--status", "implemented", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));
}

#[test]
fn test_control_list_search() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["control", "list", "--search", "erasure"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Art.17"));
}

// ============================================================================
// Task and Board Tests
// ============================================================================

#[test]
fn test_task_lifecycle() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args([
            "task",
            "new",
            "--title",
            "Write retention schedule",
            "--control",
            "GDPR:Art.5",
            "--due",
            "2030-01-31",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task TASK@1"));

    grc(&tmp)
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write retention schedule"))
        .stdout(predicate::str::contains("TASK@1"));

    grc(&tmp)
        .args(["task", "status", "TASK@1", "in_progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TASK@1 is now IN_PROGRESS"));

    grc(&tmp)
        .args(["task", "show", "TASK@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GDPR:Art.5"));

    grc(&tmp)
        .args(["task", "delete", "TASK@1", "--yes"])
        .assert()
        .success();

    grc(&tmp)
        .args(["task", "list", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("0\n"));
}

#[test]
fn test_task_invalid_status_rejected() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["task", "new", "--title", "x"])
        .assert()
        .success();
    grc(&tmp)
        .args(["task", "status", "TASK@1", "blocked"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid task status"));
}

#[test]
fn test_task_sweep_marks_overdue() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["task", "new", "--title", "Late one", "--due", "2026-01-01"])
        .assert()
        .success();
    grc(&tmp)
        .args(["task", "new", "--title", "On time", "--due", "2026-12-31"])
        .assert()
        .success();

    grc(&tmp)
        .args(["task", "sweep", "--on", "2026-06-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked 1 task(s) overdue"));

    grc(&tmp)
        .args(["task", "list", "--status", "overdue", "-f", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TASK-"));
}

#[test]
fn test_board_show_and_move() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["task", "new", "--title", "Map data flows"])
        .assert()
        .success();

    grc(&tmp)
        .args(["board", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("To Do (1)"))
        .stdout(predicate::str::contains("Map data flows"));

    grc(&tmp)
        .args(["board", "move", "TASK@1", "in_review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved TASK@1 to In Review"));

    grc(&tmp)
        .args(["board", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("To Do (0)"))
        .stdout(predicate::str::contains("In Review (1)"));
}

#[test]
fn test_board_move_denied_leaves_task_unchanged() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["member", "add", "vic", "--role", "viewer"])
        .assert()
        .success();
    grc(&tmp)
        .args(["task", "new", "--title", "Review DPAs"])
        .assert()
        .success();

    grc_as(&tmp, "vic")
        .args(["board", "move", "TASK@1", "completed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("viewer"));

    grc(&tmp)
        .args(["board", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("To Do (1)"))
        .stdout(predicate::str::contains("Completed (0)"));
}

// ============================================================================
// Risk, CAPA and Training Tests
// ============================================================================

#[test]
fn test_risk_new_scores_level() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args([
            "risk",
            "new",
            "--title",
            "Processor breach",
            "-l",
            "4",
            "-i",
            "5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("score 20, critical"));

    grc(&tmp)
        .args(["risk", "list", "--min-level", "high"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Processor breach"));
}

#[test]
fn test_risk_rating_out_of_range() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["risk", "new", "--title", "x", "-l", "6", "-i", "1"])
        .assert()
        .failure();
}

#[test]
fn test_capa_open_and_close() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args([
            "capa",
            "new",
            "--title",
            "Rotate leaked API keys",
            "--type",
            "corrective",
            "--source",
            "incident",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Opened CAPA CAPA@1"));

    grc(&tmp)
        .args(["capa", "close", "CAPA@1", "--on", "2026-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Closed CAPA CAPA@1 on 2026-05-01"));

    grc(&tmp)
        .args(["capa", "list", "--open", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("0\n"));

    grc(&tmp)
        .args(["capa", "edit", "CAPA@1", "--status", "open"])
        .assert()
        .success();
    let out = stdout_of(grc(&tmp).args(["capa", "show", "CAPA@1", "-f", "json"]));
    let capa: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(capa["status"], "open");
    assert!(capa.get("closed_date").is_none());
    assert!(capa.get("closed_by").is_none());
}

#[test]
fn test_training_program() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args([
            "training",
            "new",
            "--title",
            "Privacy awareness",
            "--frequency",
            "annual",
            "--mandatory",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created training program TRN@1"));

    grc(&tmp)
        .args(["training", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Privacy awareness"));
}

// ============================================================================
// Membership and Access Tests
// ============================================================================

#[test]
fn test_first_member_must_be_owner() {
    let tmp = setup_workspace();
    grc(&tmp)
        .args(["member", "add", "alice", "--role", "member"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be an owner"));
}

#[test]
fn test_non_member_is_denied() {
    let tmp = setup_seeded();
    grc_as(&tmp, "mallory")
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an active member"));
}

#[test]
fn test_member_cannot_seed() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["member", "add", "bob", "--role", "member"])
        .assert()
        .success();

    grc_as(&tmp, "bob")
        .args(["task", "new", "--title", "Allowed"])
        .assert()
        .success();

    grc_as(&tmp, "bob")
        .args(["seed", "--framework", "HIPAA"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is a member"));
}

#[test]
fn test_admin_cannot_grant_owner() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["member", "add", "ada", "--role", "admin"])
        .assert()
        .success();

    grc_as(&tmp, "ada")
        .args(["member", "add", "eve", "--role", "owner"])
        .assert()
        .failure();

    grc_as(&tmp, "ada")
        .args(["member", "add", "carol", "--role", "auditor"])
        .assert()
        .success();
}

#[test]
fn test_whoami() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["member", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice (owner)"));
}

// ============================================================================
// Snapshot Tests
// ============================================================================

#[test]
fn test_snapshot_export_and_import() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["control", "implement", "GDPR:Art.32", "-s", "in_progress"])
        .assert()
        .success();

    let file = tmp.path().join("gdpr.json");
    grc(&tmp)
        .args(["snapshot", "export", "GDPR", "--with-status", "-o"])
        .arg(&file)
        .assert()
        .success();

    let json = fs::read_to_string(&file).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["framework"]["code"], "GDPR");
    assert!(json.contains("in_progress"));

    let other = setup_workspace();
    grc(&other)
        .args(["snapshot", "import", "--restore-status"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported GDPR (created"));

    grc(&other)
        .args(["control", "list", "-F", "GDPR", "--status", "in_progress", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));
}

#[test]
fn test_snapshot_export_to_stdout() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["snapshot", "export", "GDPR"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"schema_version\""));
}

#[test]
fn test_snapshot_import_rejects_invalid_json() {
    let tmp = setup_seeded();
    let file = tmp.path().join("bad.json");
    fs::write(&file, r#"{"framework": {"code": "X"}}"#).unwrap();
    grc(&tmp)
        .args(["snapshot", "import"])
        .arg(&file)
        .assert()
        .failure();
}

#[test]
fn test_snapshot_import_checks_content_hash() {
    let tmp = setup_seeded();
    let json = stdout_of(grc(&tmp).args(["snapshot", "export", "GDPR"]));
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["framework"]["name"] = serde_json::json!("Edited by hand");
    let file = tmp.path().join("edited.json");
    fs::write(&file, value.to_string()).unwrap();

    let other = setup_workspace();
    grc(&other)
        .args(["snapshot", "import"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("hash"));
    grc(&other)
        .args(["framework", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No frameworks seeded"));

    grc(&other)
        .args(["snapshot", "import", "--force"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported GDPR (created"));
}

#[test]
fn test_framework_delete_removes_tree() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["control", "implement", "GDPR:Art.30", "--status", "implemented"])
        .assert()
        .success();
    grc(&tmp)
        .args(["task", "new", "--title", "Update ROPA", "--control", "GDPR:Art.30"])
        .assert()
        .success();

    grc(&tmp)
        .args(["framework", "delete", "GDPR", "--yes"])
        .assert()
        .success();

    grc(&tmp)
        .args(["framework", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No frameworks seeded"));
    grc(&tmp)
        .args(["control", "show", "GDPR:Art.30"])
        .assert()
        .failure();

    let out = stdout_of(grc(&tmp).args(["task", "show", "TASK@1", "-f", "json"]));
    let task: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(task.get("control_id").is_none());
}

#[test]
fn test_snapshot_publish_requires_store() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["snapshot", "publish", "GDPR"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GRC_SNAPSHOT_STORE"));
}

#[test]
fn test_snapshot_publish_to_local_store() {
    let tmp = setup_seeded();
    let store_dir = tmp.path().join("store");
    fs::create_dir_all(&store_dir).unwrap();
    let url = format!("file://{}", store_dir.display());

    grc(&tmp)
        .env("GRC_SNAPSHOT_STORE", &url)
        .args(["snapshot", "publish", "GDPR"])
        .assert()
        .success()
        .stdout(predicate::str::contains("latest.json"));

    assert!(store_dir.join("snapshots/GDPR/latest.json").is_file());
}

// ============================================================================
// Status and Report Tests
// ============================================================================

#[test]
fn test_status_dashboard() {
    let tmp = setup_seeded();
    grc(&tmp)
        .args(["task", "new", "--title", "Anything"])
        .assert()
        .success();

    grc(&tmp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("FRAMEWORK COVERAGE"))
        .stdout(predicate::str::contains("GDPR"))
        .stdout(predicate::str::contains("To Do: 1"));
}

#[test]
fn test_status_json() {
    let tmp = setup_seeded();
    let out = stdout_of(grc(&tmp).args(["status", "-f", "json"]));
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["coverage"][0]["code"], "GDPR");
    assert_eq!(value["open_capas"], 0);
}

#[test]
fn test_compliance_report_to_file() {
    let tmp = setup_seeded();
    let file = tmp.path().join("report.md");
    grc(&tmp)
        .env("GRC_ORGANIZATION", "Acme")
        .args(["report", "compliance", "-o"])
        .arg(&file)
        .assert()
        .success();

    let report = fs::read_to_string(&file).unwrap();
    assert!(report.starts_with("# Compliance Report: Acme"));
    assert!(report.contains("GDPR"));
}
