//! keel-core - Core library for Keel
//!
//! This crate provides migration version identifiers, migration units and
//! their discovery, project configuration, the per-engine bootstrap
//! templates, and project/migration scaffolding shared by all Keel crates.

pub mod config;
pub mod error;
pub mod scaffold;
pub(crate) mod serde_helpers;
pub mod source;
pub mod templates;
pub mod unit;
pub mod version;

pub use config::{Config, DatabaseConfig, EngineKind, TargetConfig};
pub use error::{CoreError, CoreResult};
pub use source::{DirectorySource, EmbeddedMigration, EmbeddedSource, MigrationSource};
pub use templates::{bootstrap_sql, BOOTSTRAP_MIGRATION, LEDGER_TABLE};
pub use unit::{is_blank_script, MigrationUnit};
pub use version::VersionIdentifier;
