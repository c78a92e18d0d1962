//! Error types for keel-core

use thiserror::Error;

/// Core error type for Keel
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Project directory not found
    #[error("[E004] Project directory not found: {path}")]
    ProjectNotFound { path: String },

    /// V001: Malformed migration identifier
    #[error("[V001] Invalid migration version '{raw}': {reason}")]
    InvalidVersion { raw: String, reason: String },

    // Discovery error types (DSC001-DSC005)
    /// DSC001: Migration directory has no up-script for the selected engine
    #[error("[DSC001] Migration '{version}' has no up.sql ({path})")]
    MissingUpScript { version: String, path: String },

    /// DSC002: Two migration units share an identifier
    #[error("[DSC002] Duplicate migration version '{version}' in {path1} and {path2}")]
    DuplicateVersion {
        version: String,
        path1: String,
        path2: String,
    },

    /// DSC003: Migration provides per-engine scripts but not for the selected engine
    #[error("[DSC003] Migration '{version}' has no '{engine}' variant (found: {available})")]
    MissingEngineVariant {
        version: String,
        engine: String,
        available: String,
    },

    /// DSC004: Migration directory is not usable
    #[error("[DSC004] Invalid migration directory at '{path}': {reason}")]
    InvalidMigrationDirectory { path: String, reason: String },

    /// DSC005: Configured migration path does not exist
    #[error("[DSC005] Migration path not found: {path}")]
    MigrationPathNotFound { path: String },

    /// E010: Scaffolding refused to overwrite or create a file
    #[error("[E010] Cannot generate migration: {reason}")]
    GenerateRefused { reason: String },

    /// E011: Template render error
    #[error("[E011] Template render error: {0}")]
    Template(String),

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<minijinja::Error> for CoreError {
    fn from(err: minijinja::Error) -> Self {
        CoreError::Template(err.to_string())
    }
}

impl CoreError {
    /// Returns `true` for errors raised while discovering migration units.
    pub fn is_discovery_error(&self) -> bool {
        matches!(
            self,
            CoreError::MissingUpScript { .. }
                | CoreError::DuplicateVersion { .. }
                | CoreError::MissingEngineVariant { .. }
                | CoreError::InvalidMigrationDirectory { .. }
                | CoreError::MigrationPathNotFound { .. }
                | CoreError::InvalidVersion { .. }
        )
    }
}
