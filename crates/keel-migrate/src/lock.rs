//! Cross-process run lock.
//!
//! A single-row `migration_lock` table. Acquiring inserts row `id = 1`; a
//! second run hits the primary key and fails fast with `LockContention`.

use crate::error::{MigrateError, MigrateResult};
use keel_db::Database;
use std::sync::Arc;
use uuid::Uuid;

/// Name of the lock table.
pub const LOCK_TABLE: &str = "migration_lock";

const LOCK_DDL: &str = "CREATE TABLE IF NOT EXISTS migration_lock (
    id INTEGER PRIMARY KEY,
    holder VARCHAR(64) NOT NULL,
    acquired_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

/// A held run lock. Call [`RunLock::release`] when the run ends.
pub struct RunLock {
    db: Arc<dyn Database>,
    holder: String,
}

impl std::fmt::Debug for RunLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLock")
            .field("holder", &self.holder)
            .finish()
    }
}

impl RunLock {
    /// Take the lock or fail with `LockContention` naming the current holder.
    pub async fn acquire(db: Arc<dyn Database>) -> MigrateResult<Self> {
        db.execute(LOCK_DDL).await?;

        let holder = Uuid::new_v4().to_string();
        match db
            .execute_params(
                "INSERT INTO migration_lock (id, holder) VALUES (1, ?)",
                &[holder.as_str()],
            )
            .await
        {
            Ok(_) => {
                log::debug!("Acquired {} as {}", LOCK_TABLE, holder);
                Ok(Self { db, holder })
            }
            Err(e) if e.is_constraint_violation() => {
                let current = current_holder(db.as_ref())
                    .await?
                    .unwrap_or_else(|| "unknown holder".to_string());
                Err(MigrateError::LockContention { holder: current })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Drop the lock row if it is still ours.
    pub async fn release(self) {
        match self
            .db
            .execute_params(
                "DELETE FROM migration_lock WHERE id = 1 AND holder = ?",
                &[self.holder.as_str()],
            )
            .await
        {
            Ok(0) => log::warn!("{} was no longer held by {}", LOCK_TABLE, self.holder),
            Ok(_) => log::debug!("Released {}", LOCK_TABLE),
            Err(e) => log::warn!("Failed to release {}: {}", LOCK_TABLE, e),
        }
    }
}

/// Describe the current lock holder, if any.
pub async fn current_holder(db: &dyn Database) -> MigrateResult<Option<String>> {
    if !db.relation_exists(LOCK_TABLE).await? {
        return Ok(None);
    }
    let rows = db
        .query_strings(
            "SELECT holder, CAST(acquired_at AS TEXT) FROM migration_lock WHERE id = 1",
            &[],
        )
        .await?;

    Ok(rows.into_iter().next().map(|row| {
        let mut cols = row.into_iter();
        let holder = cols.next().flatten().unwrap_or_default();
        match cols.next().flatten() {
            Some(since) => format!("{holder} since {since}"),
            None => holder,
        }
    }))
}

/// Remove the lock regardless of holder. Returns whether a lock was held.
pub async fn force_unlock(db: &dyn Database) -> MigrateResult<bool> {
    if !db.relation_exists(LOCK_TABLE).await? {
        return Ok(false);
    }
    let deleted = db.execute("DELETE FROM migration_lock WHERE id = 1").await?;
    if deleted > 0 {
        log::info!("Cleared stale {}", LOCK_TABLE);
    }
    Ok(deleted > 0)
}
