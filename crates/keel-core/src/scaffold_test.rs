use super::*;
use crate::config::Config;
use crate::source::{DirectorySource, MigrationSource};
use chrono::TimeZone;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
}

#[test]
fn test_setup_writes_config_and_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let report = setup(dir.path(), EngineKind::Sqlite, "app.db").unwrap();

    assert!(report.config_written);
    assert!(report.bootstrap_written);
    assert_eq!(
        report.bootstrap_path,
        dir.path()
            .join("migrations/00000000000000_keel_initial_setup/sqlite/up.sql")
    );
    assert_eq!(
        fs::read_to_string(&report.bootstrap_path).unwrap(),
        bootstrap_sql(EngineKind::Sqlite)
    );
    // Bootstrap is up-only
    assert!(!report
        .bootstrap_path
        .with_file_name(DOWN_SCRIPT)
        .exists());

    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.database.engine, EngineKind::Sqlite);
    assert_eq!(config.database.path, "app.db");
    assert_eq!(config.migration_paths, vec!["migrations".to_string()]);
}

#[test]
fn test_setup_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), EngineKind::DuckDb, "app.duckdb").unwrap();
    let second = setup(dir.path(), EngineKind::DuckDb, "other.duckdb").unwrap();

    assert!(!second.config_written);
    assert!(!second.bootstrap_written);
    // Existing config kept its original database path
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.database.path, "app.duckdb");
}

#[test]
fn test_setup_output_is_discoverable() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), EngineKind::Sqlite, "app.db").unwrap();

    let units = DirectorySource::new(dir.path().join("migrations"), EngineKind::Sqlite)
        .discover()
        .unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].id(), "00000000000000_keel_initial_setup");
    assert!(!units[0].is_reversible());
}

#[test]
fn test_generate_creates_engine_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let generated = generate(
        dir.path(),
        "Add Users Table",
        EngineKind::Sqlite,
        fixed_now(),
        false,
    )
    .unwrap();

    assert_eq!(generated.version, "20240315093000_add_users_table");
    assert!(generated.written);
    assert_eq!(
        generated.up_path,
        dir.path()
            .join("20240315093000_add_users_table/sqlite/up.sql")
    );

    let up = fs::read_to_string(&generated.up_path).unwrap();
    assert!(up.contains("-- Migration: Add Users Table"), "{up}");
    assert!(up.contains("-- Version: 20240315093000_add_users_table"), "{up}");
    assert!(up.contains("-- Created: 2024-03-15 09:30:00 UTC"), "{up}");
    assert!(generated.down_path.exists());
}

#[test]
fn test_unedited_generated_migration_is_irreversible() {
    let dir = tempfile::tempdir().unwrap();
    let generated = generate(dir.path(), "todo", EngineKind::Sqlite, fixed_now(), false).unwrap();

    let units = DirectorySource::new(dir.path(), EngineKind::Sqlite)
        .discover()
        .unwrap();
    assert_eq!(units.len(), 1);
    assert!(!units[0].is_reversible());

    fs::write(&generated.down_path, "DROP TABLE todo;").unwrap();
    let units = DirectorySource::new(dir.path(), EngineKind::Sqlite)
        .discover()
        .unwrap();
    assert!(units[0].is_reversible());
}

#[test]
fn test_generate_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let generated = generate(dir.path(), "noop", EngineKind::DuckDb, fixed_now(), true).unwrap();

    assert!(!generated.written);
    assert!(!generated.dir.exists());
    assert_eq!(
        generated.up_path,
        dir.path().join("20240315093000_noop/duckdb/up.sql")
    );
}

#[test]
fn test_generate_refuses_existing_variant() {
    let dir = tempfile::tempdir().unwrap();
    generate(dir.path(), "dup", EngineKind::Sqlite, fixed_now(), false).unwrap();
    let err = generate(dir.path(), "dup", EngineKind::Sqlite, fixed_now(), false).unwrap_err();
    assert!(matches!(err, CoreError::GenerateRefused { .. }));

    // A second engine variant for the same unit is allowed
    generate(dir.path(), "dup", EngineKind::DuckDb, fixed_now(), false).unwrap();
}

#[test]
fn test_generate_rejects_bad_names() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["", "  ", "../escape", "a/b", ".hidden", "-flag", "semi;colon"] {
        let result = generate(dir.path(), name, EngineKind::Sqlite, fixed_now(), true);
        assert!(
            matches!(result, Err(CoreError::GenerateRefused { .. })),
            "expected refusal for {name:?}"
        );
    }
}
