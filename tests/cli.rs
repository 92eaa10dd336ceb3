//! End-to-end tests for the `sheetbook` binary
//!
//! Every test runs against its own data directory.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn sheetbook(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sheetbook").unwrap();
    cmd.env("SHEETBOOK_DATA_DIR", dir.path())
        .env_remove("RUST_LOG")
        .env_remove("SHEETBOOK_PASSWORD");
    cmd
}

fn register(dir: &TempDir, username: &str) {
    sheetbook(dir)
        .args(["register", username, "--password", "correct horse"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("logged in as {}", username)));
}

/// Pull the `ID: ...` line out of a create command's output
fn created_id(output: &[u8]) -> String {
    String::from_utf8_lossy(output)
        .lines()
        .find_map(|line| line.trim().strip_prefix("ID: ").map(str::to_string))
        .unwrap()
}

#[test]
fn test_config_shows_paths() {
    let dir = TempDir::new().unwrap();
    sheetbook(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Data directory:"))
        .stdout(predicate::str::contains("Default route:   /sheets"));
}

#[test]
fn test_anonymous_open_shows_login() {
    let dir = TempDir::new().unwrap();
    sheetbook(&dir)
        .args(["open", "/sheets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn test_session_persists_between_runs() {
    let dir = TempDir::new().unwrap();
    register(&dir, "ada");

    sheetbook(&dir)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ada ("));

    sheetbook(&dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out ada."));

    sheetbook(&dir)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_wrong_password_fails() {
    let dir = TempDir::new().unwrap();
    register(&dir, "ada");
    sheetbook(&dir).arg("logout").assert().success();

    sheetbook(&dir)
        .args(["login", "ada", "--password", "not the password"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid username or password"));
}

#[test]
fn test_sheet_and_expense_flow() {
    let dir = TempDir::new().unwrap();
    register(&dir, "ada");

    let output = sheetbook(&dir)
        .args(["sheet", "add", "October pay", "2500", "--date", "2025-10-01"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let sheet = created_id(&output.stdout);

    sheetbook(&dir)
        .args(["expense", "add", &sheet, "Rent", "1200.00", "--date", "2025-10-02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added expense: Rent $1200.00"));

    sheetbook(&dir)
        .args(["sheet", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("October pay"))
        .stdout(predicate::str::contains("$1300.00"));

    sheetbook(&dir)
        .args(["sheet", "show", &sheet])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rent"));

    sheetbook(&dir)
        .args(["sheet", "remove", &sheet])
        .assert()
        .success();

    sheetbook(&dir)
        .args(["sheet", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No income sheets yet"));
}

#[test]
fn test_debt_payments() {
    let dir = TempDir::new().unwrap();
    register(&dir, "ada");

    let output = sheetbook(&dir)
        .args(["debt", "add", "Bank", "100", "--notes", "car repair"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let debt = created_id(&output.stdout);

    sheetbook(&dir)
        .args(["debt", "pay", &debt, "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Remaining: $60.00"));

    sheetbook(&dir)
        .args(["debt", "pay", &debt, "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Debt settled!"));

    sheetbook(&dir)
        .args(["debt", "show", &debt])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status:     Settled"));
}

#[test]
fn test_open_resumes_last_route() {
    let dir = TempDir::new().unwrap();
    register(&dir, "ada");
    sheetbook(&dir).args(["debt", "list"]).assert().success();

    sheetbook(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No debts tracked"));
}

#[test]
fn test_data_commands_require_login() {
    let dir = TempDir::new().unwrap();
    sheetbook(&dir)
        .args(["debt", "add", "Bank", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_unknown_sheet_reports_not_found() {
    let dir = TempDir::new().unwrap();
    register(&dir, "ada");
    sheetbook(&dir)
        .args(["sheet", "show", "sht-00000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
