//! Configuration types and parsing for keel.yml

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::default_true;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file names searched in a project directory, in priority order.
pub const CONFIG_FILE_NAMES: &[&str] = &["keel.yml", "keel.yaml"];

/// Environment variable consulted when no `--target` flag is given.
pub const TARGET_ENV_VAR: &str = "KEEL_TARGET";

/// Project settings read from `keel.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Human-readable project name
    pub name: String,

    /// Directories containing migration units
    #[serde(default = "default_migration_paths")]
    pub migration_paths: Vec<String>,

    /// Fail planning when the ledger holds versions no migration unit accounts for
    #[serde(default = "default_true")]
    pub check_orphans: bool,

    /// Base database, used when no target is selected
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Alternative databases selectable with `--target` / `KEEL_TARGET`
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Per-target overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// Database engine selector.
///
/// Also names the per-engine script directory inside each migration unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// DuckDB
    DuckDb,
    /// PostgreSQL
    Postgres,
    /// MySQL
    MySql,
}

impl EngineKind {
    /// Every supported engine, in display order.
    pub const ALL: [EngineKind; 4] = [
        EngineKind::Sqlite,
        EngineKind::DuckDb,
        EngineKind::Postgres,
        EngineKind::MySql,
    ];

    /// Name of the script directory for this engine.
    pub fn dir_name(&self) -> &'static str {
        match self {
            EngineKind::Sqlite => "sqlite",
            EngineKind::DuckDb => "duckdb",
            EngineKind::Postgres => "postgres",
            EngineKind::MySql => "mysql",
        }
    }

    /// Look up an engine by its directory name.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.dir_name() == name)
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for EngineKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::from_dir_name(&s.to_ascii_lowercase()).ok_or_else(|| CoreError::ConfigInvalid {
            message: format!(
                "Unknown database type '{}'. Supported: {}",
                s,
                Self::ALL
                    .iter()
                    .map(|e| e.dir_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
    }
}

/// Which engine to talk to and where its database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database engine
    #[serde(rename = "type", default)]
    pub engine: EngineKind,

    /// Database path or connection string (`:memory:` for an in-memory database)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "keel.db".to_string()
}

fn default_migration_paths() -> Vec<String> {
    vec!["migrations".to_string()]
}

impl Config {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let shown = || path.display().to_string();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::ConfigNotFound { path: shown() })
            }
            Err(e) => {
                return Err(CoreError::IoWithPath {
                    path: shown(),
                    source: e,
                })
            }
        };

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            CoreError::ConfigParseError {
                message: format!("{}: {e}", shown()),
            }
        })?;
        config.check()?;
        log::debug!("Loaded config '{}' from {}", config.name, shown());
        Ok(config)
    }

    /// Find `keel.yml` (or `keel.yaml`) in `dir` and load it.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        if !dir.is_dir() {
            return Err(CoreError::ProjectNotFound {
                path: dir.display().to_string(),
            });
        }

        match CONFIG_FILE_NAMES.iter().map(|n| dir.join(n)).find(|p| p.is_file()) {
            Some(path) => Self::load(&path),
            None => Err(CoreError::ConfigNotFound {
                path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
            }),
        }
    }

    fn check(&self) -> CoreResult<()> {
        let invalid = |message: &str| {
            Err(CoreError::ConfigInvalid {
                message: message.to_string(),
            })
        };

        if self.name.trim().is_empty() {
            return invalid("name must not be empty");
        }
        if self.migration_paths.is_empty() {
            return invalid("migration_paths needs at least one directory");
        }
        if self.migration_paths.iter().any(|p| p.trim().is_empty()) {
            return invalid("migration_paths contains an empty entry");
        }
        Ok(())
    }

    /// Migration directories joined onto the project root.
    pub fn migration_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.migration_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Names of the configured targets, sorted.
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Database settings for `target`, or the base `database` block when `None`.
    ///
    /// A target without its own `database` block inherits the base one.
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        let Some(name) = target else {
            return Ok(self.database.clone());
        };

        let Some(target_config) = self.targets.get(name) else {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "Target '{name}' not found. Available targets: {}",
                    self.available_targets().join(", ")
                ),
            });
        };

        Ok(target_config
            .database
            .as_ref()
            .unwrap_or(&self.database)
            .clone())
    }

    /// Pick the target name: the CLI flag wins, then `KEEL_TARGET`.
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        match cli_target {
            Some(t) => Some(t.to_string()),
            None => std::env::var(TARGET_ENV_VAR).ok(),
        }
        .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
