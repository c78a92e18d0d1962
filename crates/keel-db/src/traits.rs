//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use keel_core::EngineKind;

/// Live connection capability handed to the migration engine.
///
/// A backend wraps exactly one connection, so `begin`/`commit`/`rollback`
/// bracket every statement issued through the same value in between.
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute one SQL statement, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute one SQL statement with positional `?` text parameters
    async fn execute_params(&self, sql: &str, params: &[&str]) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and return every row as text.
    ///
    /// Each selected column must already be text (or NULL); CAST other
    /// types in SQL.
    async fn query_strings(
        &self,
        sql: &str,
        params: &[&str],
    ) -> DbResult<Vec<Vec<Option<String>>>>;

    /// Execute query returning row count
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Open a transaction on this connection
    async fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> DbResult<()>;

    /// Engine this backend talks to
    fn engine(&self) -> EngineKind;
}
