//! Backend selection from configuration

use crate::duckdb::DuckDbBackend;
use crate::error::{DbError, DbResult};
use crate::sqlite::SqliteBackend;
use crate::traits::Database;
use keel_core::{DatabaseConfig, EngineKind};
use std::sync::Arc;

/// Open a connection for the configured engine.
///
/// PostgreSQL and MySQL scripts can be discovered and generated, but no
/// driver ships for them yet.
pub fn connect(config: &DatabaseConfig) -> DbResult<Arc<dyn Database>> {
    log::debug!("Connecting to {} database at {}", config.engine, config.path);
    match config.engine {
        EngineKind::Sqlite => Ok(Arc::new(SqliteBackend::new(&config.path)?)),
        EngineKind::DuckDb => Ok(Arc::new(DuckDbBackend::new(&config.path)?)),
        EngineKind::Postgres | EngineKind::MySql => Err(DbError::NotImplemented {
            backend: config.engine.to_string(),
            feature: "connection".to_string(),
        }),
    }
}
