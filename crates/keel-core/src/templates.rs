//! Embedded per-engine templates.
//!
//! The bootstrap migration that creates the `migration_history` ledger table
//! ships in one variant per engine. The ledger executes the same text when it
//! initializes itself, so a project's on-disk bootstrap unit and the table the
//! ledger creates never drift apart.

use crate::config::EngineKind;

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "migration_history";

/// Directory name of the bootstrap migration written by `setup`.
pub const BOOTSTRAP_MIGRATION: &str = "00000000000000_keel_initial_setup";

const SQLITE_BOOTSTRAP: &str =
    include_str!("../templates/migrations/00000000000000_keel_initial_setup/sqlite/up.sql");
const DUCKDB_BOOTSTRAP: &str =
    include_str!("../templates/migrations/00000000000000_keel_initial_setup/duckdb/up.sql");
const POSTGRES_BOOTSTRAP: &str =
    include_str!("../templates/migrations/00000000000000_keel_initial_setup/postgres/up.sql");
const MYSQL_BOOTSTRAP: &str =
    include_str!("../templates/migrations/00000000000000_keel_initial_setup/mysql/up.sql");

pub(crate) const CONFIG_TEMPLATE: &str = include_str!("../templates/keel.yml.j2");
pub(crate) const UP_TEMPLATE: &str = include_str!("../templates/generate/up.sql.j2");
pub(crate) const DOWN_TEMPLATE: &str = include_str!("../templates/generate/down.sql.j2");

/// DDL creating the ledger table for `engine` (idempotent).
pub fn bootstrap_sql(engine: EngineKind) -> &'static str {
    match engine {
        EngineKind::Sqlite => SQLITE_BOOTSTRAP,
        EngineKind::DuckDb => DUCKDB_BOOTSTRAP,
        EngineKind::Postgres => POSTGRES_BOOTSTRAP,
        EngineKind::MySql => MYSQL_BOOTSTRAP,
    }
}
