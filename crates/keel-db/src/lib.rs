//! keel-db - Database abstraction layer for Keel
//!
//! This crate provides the `Database` connection trait the migration engine
//! runs against, with SQLite and DuckDB implementations.

pub mod connect;
pub mod duckdb;
pub mod error;
pub mod sqlite;
pub mod traits;

pub use connect::connect;
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use sqlite::SqliteBackend;
pub use traits::Database;
