use super::*;
use std::fs;

// ── Helpers ────────────────────────────────────────────────────────────

/// Write a unit directory; `engine` of `None` writes engine-agnostic scripts.
fn write_unit(root: &Path, version: &str, engine: Option<&str>, up: &str, down: Option<&str>) {
    let dir = match engine {
        Some(e) => root.join(version).join(e),
        None => root.join(version),
    };
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(UP_SCRIPT), up).unwrap();
    if let Some(down) = down {
        fs::write(dir.join(DOWN_SCRIPT), down).unwrap();
    }
}

fn versions(units: &[MigrationUnit]) -> Vec<&str> {
    units.iter().map(|u| u.id().as_str()).collect()
}

// ── DirectorySource ────────────────────────────────────────────────────

#[test]
fn test_discover_sorted_by_version() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "20240301_c", None, "SELECT 3;", None);
    write_unit(dir.path(), "20240101_a", None, "SELECT 1;", Some("SELECT -1;"));
    write_unit(dir.path(), "20240201_b", None, "SELECT 2;", None);

    let source = DirectorySource::new(dir.path(), EngineKind::Sqlite);
    let units = source.discover().unwrap();

    assert_eq!(versions(&units), vec!["20240101_a", "20240201_b", "20240301_c"]);
    assert_eq!(units[0].name(), "a");
    assert_eq!(units[0].down_script(), Some("SELECT -1;"));
    assert!(!units[1].is_reversible());
    assert_eq!(units[0].origin(), Some(&dir.path().join("20240101_a")));
}

#[test]
fn test_discover_is_restartable() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "20240101_a", None, "SELECT 1;", None);

    let source = DirectorySource::new(dir.path(), EngineKind::Sqlite);
    let first = source.discover().unwrap();
    let second = source.discover().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_discover_selects_engine_variant() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "20240101_a", Some("sqlite"), "-- sqlite", Some("-- sqlite down"));
    write_unit(dir.path(), "20240101_a", Some("duckdb"), "-- duckdb", None);

    let sqlite = DirectorySource::new(dir.path(), EngineKind::Sqlite)
        .discover()
        .unwrap();
    assert_eq!(sqlite[0].up_script(), "-- sqlite");
    assert!(sqlite[0].is_reversible());

    let duck = DirectorySource::new(dir.path(), EngineKind::DuckDb)
        .discover()
        .unwrap();
    assert_eq!(duck[0].up_script(), "-- duckdb");
    assert!(!duck[0].is_reversible());
}

#[test]
fn test_discover_missing_engine_variant() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "20240101_a", Some("sqlite"), "SELECT 1;", None);

    let err = DirectorySource::new(dir.path(), EngineKind::Postgres)
        .discover()
        .unwrap_err();
    match err {
        CoreError::MissingEngineVariant {
            version,
            engine,
            available,
        } => {
            assert_eq!(version, "20240101_a");
            assert_eq!(engine, "postgres");
            assert_eq!(available, "sqlite");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_discover_missing_up_script() {
    let dir = tempfile::tempdir().unwrap();
    let unit_dir = dir.path().join("20240101_a");
    fs::create_dir_all(&unit_dir).unwrap();
    fs::write(unit_dir.join(DOWN_SCRIPT), "DROP TABLE a;").unwrap();

    let err = DirectorySource::new(dir.path(), EngineKind::Sqlite)
        .discover()
        .unwrap_err();
    assert!(matches!(err, CoreError::MissingUpScript { .. }), "{err:?}");
    assert!(err.is_discovery_error());
}

#[test]
fn test_discover_rejects_malformed_directory_name() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "create_users", None, "SELECT 1;", None);

    let err = DirectorySource::new(dir.path(), EngineKind::Sqlite)
        .discover()
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidVersion { .. }), "{err:?}");
}

#[test]
fn test_discover_duplicate_across_paths() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    write_unit(a.path(), "20240101_a", None, "SELECT 1;", None);
    write_unit(b.path(), "20240101_a", None, "SELECT 1;", None);

    let source = DirectorySource::with_paths(
        vec![a.path().to_path_buf(), b.path().to_path_buf()],
        EngineKind::Sqlite,
    );
    let err = source.discover().unwrap_err();
    assert!(matches!(err, CoreError::DuplicateVersion { .. }), "{err:?}");
}

#[test]
fn test_discover_skips_files_and_hidden_directories() {
    let dir = tempfile::tempdir().unwrap();
    write_unit(dir.path(), "20240101_a", None, "SELECT 1;", None);
    fs::write(dir.path().join("README.md"), "notes").unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();

    let units = DirectorySource::new(dir.path(), EngineKind::Sqlite)
        .discover()
        .unwrap();
    assert_eq!(versions(&units), vec!["20240101_a"]);
}

#[test]
fn test_discover_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = DirectorySource::new(dir.path().join("nope"), EngineKind::Sqlite)
        .discover()
        .unwrap_err();
    assert!(matches!(err, CoreError::MigrationPathNotFound { .. }));
}

// ── EmbeddedSource ─────────────────────────────────────────────────────

static EMBEDDED: &[EmbeddedMigration] = &[
    EmbeddedMigration {
        version: "20240102_b",
        up: "CREATE TABLE b (id INTEGER);",
        down: None,
    },
    EmbeddedMigration {
        version: "20240101_a",
        up: "CREATE TABLE a (id INTEGER);",
        down: Some("DROP TABLE a;"),
    },
];

static EMBEDDED_DUPLICATE: &[EmbeddedMigration] = &[
    EmbeddedMigration {
        version: "1_a",
        up: "SELECT 1;",
        down: None,
    },
    EmbeddedMigration {
        version: "1_a",
        up: "SELECT 2;",
        down: None,
    },
];

#[test]
fn test_embedded_source_sorts() {
    let source = EmbeddedSource::new(EMBEDDED, EngineKind::DuckDb);
    let units = source.discover().unwrap();
    assert_eq!(versions(&units), vec!["20240101_a", "20240102_b"]);
    assert_eq!(source.engine(), EngineKind::DuckDb);
    assert!(units[0].is_reversible());
}

#[test]
fn test_embedded_source_rejects_duplicates() {
    let err = EmbeddedSource::new(EMBEDDED_DUPLICATE, EngineKind::Sqlite)
        .discover()
        .unwrap_err();
    match err {
        CoreError::DuplicateVersion { path1, path2, .. } => {
            assert_eq!(path1, "<embedded>");
            assert_eq!(path2, "<embedded>");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
