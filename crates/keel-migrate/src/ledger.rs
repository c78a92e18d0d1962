//! The `migration_history` ledger.
//!
//! One row per applied migration version. The table is created by the
//! engine's bootstrap script the first time a run applies anything, so a
//! database that was never migrated simply has no ledger.

use crate::error::{MigrateError, MigrateResult};
use chrono::NaiveDateTime;
use keel_core::{bootstrap_sql, VersionIdentifier, LEDGER_TABLE};
use keel_db::Database;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Formats accepted for `applied_at` when read back as text.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A single ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub version: VersionIdentifier,
    pub applied_at: NaiveDateTime,
}

/// Reads and writes ledger rows through a shared connection.
///
/// `record` and `forget` do not open transactions of their own; the engine
/// calls them inside the same transaction as the unit's script.
#[derive(Clone)]
pub struct Ledger {
    db: Arc<dyn Database>,
}

impl Ledger {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Whether the ledger table exists.
    pub async fn is_initialized(&self) -> MigrateResult<bool> {
        Ok(self.db.relation_exists(LEDGER_TABLE).await?)
    }

    /// Create the ledger table if it is missing. Safe to call repeatedly.
    pub async fn ensure_initialized(&self) -> MigrateResult<()> {
        log::debug!("Ensuring {} exists", LEDGER_TABLE);
        self.db
            .execute_batch(bootstrap_sql(self.db.engine()))
            .await?;
        Ok(())
    }

    /// Every version currently recorded. Empty if the ledger does not exist.
    pub async fn applied_versions(&self) -> MigrateResult<BTreeSet<VersionIdentifier>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|entry| entry.version)
            .collect())
    }

    /// All rows in insertion order. Empty if the ledger does not exist.
    pub async fn entries(&self) -> MigrateResult<Vec<LedgerEntry>> {
        if !self.is_initialized().await? {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT CAST(id AS TEXT), version, CAST(applied_at AS TEXT) FROM {} ORDER BY id",
            LEDGER_TABLE
        );
        let rows = self.db.query_strings(&sql, &[]).await?;
        rows.into_iter().map(parse_row).collect()
    }

    /// Whether `version` has a ledger row.
    pub async fn contains(&self, version: &VersionIdentifier) -> MigrateResult<bool> {
        if !self.is_initialized().await? {
            return Ok(false);
        }
        let rows = self
            .db
            .query_strings(
                &format!("SELECT version FROM {} WHERE version = ?", LEDGER_TABLE),
                &[version.as_str()],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Insert a row for `version`.
    pub async fn record(&self, version: &VersionIdentifier) -> MigrateResult<()> {
        if self.contains(version).await? {
            return Err(MigrateError::DuplicateVersion {
                version: version.clone(),
            });
        }

        let sql = format!("INSERT INTO {} (version) VALUES (?)", LEDGER_TABLE);
        match self.db.execute_params(&sql, &[version.as_str()]).await {
            Ok(_) => {
                log::debug!("Recorded {} in {}", version, LEDGER_TABLE);
                Ok(())
            }
            Err(e) if e.is_constraint_violation() => Err(MigrateError::DuplicateVersion {
                version: version.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the row for `version`.
    pub async fn forget(&self, version: &VersionIdentifier) -> MigrateResult<()> {
        let sql = format!("DELETE FROM {} WHERE version = ?", LEDGER_TABLE);
        let deleted = self.db.execute_params(&sql, &[version.as_str()]).await?;
        if deleted == 0 {
            return Err(MigrateError::NotRecorded {
                version: version.clone(),
            });
        }
        log::debug!("Removed {} from {}", version, LEDGER_TABLE);
        Ok(())
    }
}

fn parse_row(row: Vec<Option<String>>) -> MigrateResult<LedgerEntry> {
    let corrupt = |what: &str| MigrateError::CorruptLedger(format!("{what} in row {row:?}"));

    let [id, version, applied_at] = row.as_slice() else {
        return Err(corrupt("expected 3 columns"));
    };

    let id = id
        .as_deref()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| corrupt("invalid id"))?;
    let version = version
        .as_deref()
        .ok_or_else(|| corrupt("missing version"))
        .and_then(|s| {
            VersionIdentifier::parse(s).map_err(|e| MigrateError::CorruptLedger(e.to_string()))
        })?;
    let applied_at = applied_at
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or_else(|| corrupt("invalid applied_at"))?;

    Ok(LedgerEntry {
        id,
        version,
        applied_at,
    })
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
