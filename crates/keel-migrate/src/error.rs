//! Error types for the migration engine.

use keel_core::{CoreError, EngineKind, VersionIdentifier};
use keel_db::DbError;
use thiserror::Error;

/// Migration engine errors.
///
/// Planning errors (`IrreversibleMigration`, `OrphanedVersion`, `StalePlan`,
/// `LockContention`, discovery failures) are raised before any database
/// mutation. Errors raised while applying a unit leave earlier units committed.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A revert was requested through a unit that has no down-script (M001).
    #[error("[M001] Migration '{version}' cannot be reverted: it has no down script")]
    IrreversibleMigration { version: VersionIdentifier },

    /// Ledger rows with no matching migration unit (M002).
    #[error(
        "[M002] Ledger records version(s) with no matching migration: {}",
        join_versions(.versions)
    )]
    OrphanedVersion { versions: Vec<VersionIdentifier> },

    /// The database rejected a migration script (M003).
    #[error("[M003] Migration '{version}' failed: {source}")]
    ScriptExecution {
        version: VersionIdentifier,
        #[source]
        source: DbError,
    },

    /// Ledger already holds this version (M004).
    #[error("[M004] Version '{version}' is already recorded in the ledger")]
    DuplicateVersion { version: VersionIdentifier },

    /// Another run holds the serialization lock (M005).
    #[error("[M005] Another migration run holds the lock ({holder}). If no run is active, clear it with `keel migration unlock`")]
    LockContention { holder: String },

    /// Cancellation was requested between units (M006).
    #[error("[M006] Run cancelled before '{next}'")]
    Cancelled { next: VersionIdentifier },

    /// A plan handed to `apply` no longer matches the ledger (M007).
    #[error("[M007] Plan is stale at '{version}': {reason}")]
    StalePlan {
        version: VersionIdentifier,
        reason: String,
    },

    /// BEGIN or COMMIT failed around a unit (M008).
    #[error("[M008] Transaction for '{version}' failed: {source}")]
    Transaction {
        version: VersionIdentifier,
        #[source]
        source: DbError,
    },

    /// A ledger row could not be read back (M009).
    #[error("[M009] Ledger row is unreadable: {0}")]
    CorruptLedger(String),

    /// Ledger has no row to remove for a reverted version (M010).
    #[error("[M010] Version '{version}' is not recorded in the ledger")]
    NotRecorded { version: VersionIdentifier },

    /// Source scripts target a different engine than the connection (M011).
    #[error("[M011] Migrations were loaded for {source_engine} but the database is {database_engine}")]
    EngineMismatch {
        source_engine: EngineKind,
        database_engine: EngineKind,
    },

    /// Discovery or identifier error from keel-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database error outside a unit's script.
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

fn join_versions(versions: &[VersionIdentifier]) -> String {
    versions
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl MigrateError {
    /// Returns `true` if the run stopped because cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MigrateError::Cancelled { .. })
    }
}
