//! End-to-end tests for the `keel` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled keel binary
fn keel_bin() -> String {
    env!("CARGO_BIN_EXE_keel").to_string()
}

/// Run `keel -p <project> <args>` and return (stdout, stderr, exit code).
fn run_keel(project: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(keel_bin())
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .env_remove("KEEL_TARGET")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute keel with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Set up a sqlite project and return its directory.
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_keel(dir.path(), &["setup"]);
    assert_eq!(code, 0, "setup failed: {stdout}{stderr}");
    dir
}

/// Generate a migration and fill in its scripts. Returns the script directory.
fn add_migration(project: &Path, name: &str, up: &str, down: &str) -> PathBuf {
    let before = migration_dirs(project);
    let (stdout, stderr, code) = run_keel(project, &["migration", "generate", name]);
    assert_eq!(code, 0, "generate failed: {stdout}{stderr}");

    let created = migration_dirs(project)
        .into_iter()
        .find(|d| !before.contains(d))
        .expect("generate should create a directory");
    let scripts = created.join("sqlite");
    fs::write(scripts.join("up.sql"), up).unwrap();
    fs::write(scripts.join("down.sql"), down).unwrap();
    scripts
}

fn migration_dirs(project: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(project.join("migrations"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    dirs.sort();
    dirs
}

#[test]
fn test_setup_creates_config_and_bootstrap() {
    let dir = setup_project();
    assert!(dir.path().join("keel.yml").exists());
    assert!(dir
        .path()
        .join("migrations/00000000000000_keel_initial_setup/sqlite/up.sql")
        .exists());

    // Second setup leaves everything alone.
    let (stdout, _, code) = run_keel(dir.path(), &["setup"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("nothing changed"), "{stdout}");
}

#[test]
fn test_run_status_rollback_cycle() {
    let dir = setup_project();
    add_migration(
        dir.path(),
        "create users",
        "CREATE TABLE users (id INTEGER PRIMARY KEY);",
        "DROP TABLE users;",
    );

    let (stdout, _, code) = run_keel(dir.path(), &["migration", "run", "--dry-run"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("would apply 2 migration(s)"), "{stdout}");

    let (stdout, stderr, code) = run_keel(dir.path(), &["migration", "run"]);
    assert_eq!(code, 0, "{stdout}{stderr}");
    assert!(stdout.contains("Applied 00000000000000_keel_initial_setup"), "{stdout}");
    assert!(stdout.contains("2 migration(s) applied"), "{stdout}");

    let (stdout, _, code) = run_keel(dir.path(), &["migration", "run"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Nothing to do."), "{stdout}");

    let (stdout, _, code) = run_keel(dir.path(), &["migration", "status", "--output", "json"]);
    assert_eq!(code, 0);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["applied"], 2);
    assert_eq!(report["pending"], 0);
    assert_eq!(report["migrations"][1]["state"], "applied");

    let (stdout, stderr, code) = run_keel(dir.path(), &["migration", "rollback"]);
    assert_eq!(code, 0, "{stdout}{stderr}");
    assert!(stdout.contains("Reverted"), "{stdout}");

    let (stdout, _, _) = run_keel(dir.path(), &["migration", "status"]);
    assert!(stdout.contains("1 applied, 1 pending, 0 orphaned"), "{stdout}");
}

#[test]
fn test_failed_migration_exits_nonzero() {
    let dir = setup_project();
    add_migration(
        dir.path(),
        "broken",
        "CREATE TABLEE nope;",
        "SELECT 1;",
    );

    let (stdout, stderr, code) = run_keel(dir.path(), &["migration", "run"]);
    assert_eq!(code, 1, "{stdout}{stderr}");
    assert!(stderr.contains("failed"), "{stderr}");
    assert!(stderr.contains("[M003]"), "{stderr}");
    assert!(stderr.contains("committed before the failure"), "{stderr}");
}

#[test]
fn test_rollback_of_bootstrap_is_refused() {
    let dir = setup_project();
    let (_, _, code) = run_keel(dir.path(), &["migration", "run"]);
    assert_eq!(code, 0);

    let (_, stderr, code) = run_keel(dir.path(), &["migration", "rollback"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("[M001]"), "{stderr}");
}

#[test]
fn test_unlock_without_lock() {
    let dir = setup_project();
    let (stdout, _, code) = run_keel(dir.path(), &["migration", "unlock"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No migration lock was held."), "{stdout}");
}

#[test]
fn test_missing_project_reports_error() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_keel(dir.path(), &["migration", "status"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Failed to load project"), "{stderr}");
}
