//! Error types for keel-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Constraint violation, e.g. a duplicate unique key (D004)
    #[error("[D004] Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Not implemented (D005)
    #[error("[D005] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Transaction control error (D007)
    #[error("[D007] Transaction {operation} failed: {message}")]
    TransactionError { operation: String, message: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Returns `true` if the database rejected a write because of a constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DbError::ConstraintViolation(_))
    }
}

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so the message
        // is the only thing to classify on.
        let msg = err.to_string();
        if msg.contains("Constraint Error") || msg.contains("Duplicate key") {
            DbError::ConstraintViolation(msg)
        } else if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::ConstraintViolation(err.to_string())
            }
            _ => {
                let msg = err.to_string();
                if msg.contains("no such table") {
                    DbError::TableNotFound(msg)
                } else {
                    DbError::ExecutionError(msg)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_code() {
        let e = DbError::NotImplemented {
            backend: "postgres".into(),
            feature: "connect".into(),
        };
        assert_eq!(
            e.to_string(),
            "[D005] Feature not implemented for postgres: connect"
        );

        let e = DbError::TransactionError {
            operation: "COMMIT".into(),
            message: "disk full".into(),
        };
        assert_eq!(e.to_string(), "[D007] Transaction COMMIT failed: disk full");
    }

    #[test]
    fn test_sqlite_constraint_classified() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: DbError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_constraint_violation(), "{err}");
    }

    #[test]
    fn test_sqlite_missing_table_classified() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: DbError = conn
            .execute("INSERT INTO missing VALUES (1)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::TableNotFound(_)), "{err}");
    }
}
