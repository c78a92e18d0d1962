//! Migration discovery.
//!
//! A [`MigrationSource`] produces the full, ordered set of migration units for
//! one engine. Discovery has no side effects and re-reads its backing storage
//! on every call, so it can be enumerated any number of times.

use crate::config::EngineKind;
use crate::error::{CoreError, CoreResult};
use crate::unit::MigrationUnit;
use crate::version::VersionIdentifier;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File name of the mandatory apply script.
pub const UP_SCRIPT: &str = "up.sql";

/// File name of the optional revert script.
pub const DOWN_SCRIPT: &str = "down.sql";

/// Something that can enumerate migration units in apply order.
pub trait MigrationSource: Send + Sync {
    /// Load every unit, sorted ascending by version.
    ///
    /// Fails if any unit is malformed or two units share a version.
    fn discover(&self) -> CoreResult<Vec<MigrationUnit>>;

    /// Engine whose script variants this source loads.
    fn engine(&self) -> EngineKind;
}

/// Sort units by version, rejecting duplicates.
fn sort_and_check_unique(mut units: Vec<MigrationUnit>) -> CoreResult<Vec<MigrationUnit>> {
    let mut seen: HashMap<&VersionIdentifier, &MigrationUnit> = HashMap::with_capacity(units.len());
    for unit in &units {
        if let Some(existing) = seen.insert(unit.id(), unit) {
            return Err(CoreError::DuplicateVersion {
                version: unit.id().to_string(),
                path1: describe_origin(existing),
                path2: describe_origin(unit),
            });
        }
    }
    units.sort_by(|a, b| a.id().cmp(b.id()));
    Ok(units)
}

fn describe_origin(unit: &MigrationUnit) -> String {
    unit.origin()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<embedded>".to_string())
}

/// Filesystem-backed source.
///
/// Each configured path holds one directory per unit, named by its version.
/// A unit directory either contains `up.sql`/`down.sql` directly, or one
/// subdirectory per engine (`sqlite/up.sql`, `duckdb/up.sql`, ...). When
/// engine subdirectories exist the selected engine's variant is required.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    paths: Vec<PathBuf>,
    engine: EngineKind,
}

impl DirectorySource {
    /// Create a source reading from a single directory
    pub fn new(path: impl Into<PathBuf>, engine: EngineKind) -> Self {
        Self::with_paths(vec![path.into()], engine)
    }

    /// Create a source merging several directories
    pub fn with_paths(paths: Vec<PathBuf>, engine: EngineKind) -> Self {
        Self { paths, engine }
    }

    fn discover_in(&self, root: &Path, units: &mut Vec<MigrationUnit>) -> CoreResult<()> {
        if !root.is_dir() {
            return Err(CoreError::MigrationPathNotFound {
                path: root.display().to_string(),
            });
        }

        let entries = std::fs::read_dir(root).map_err(|e| CoreError::IoWithPath {
            path: root.display().to_string(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| CoreError::IoWithPath {
                path: root.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                log::debug!("Skipping non-directory entry {}", path.display());
                continue;
            }

            let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) else {
                return Err(CoreError::InvalidMigrationDirectory {
                    path: path.display().to_string(),
                    reason: "directory name is not valid UTF-8".to_string(),
                });
            };
            if dir_name.starts_with('.') {
                continue;
            }

            let version = VersionIdentifier::parse(dir_name)?;
            units.push(self.load_unit(&path, version)?);
        }
        Ok(())
    }

    fn load_unit(&self, dir: &Path, version: VersionIdentifier) -> CoreResult<MigrationUnit> {
        let script_dir = self.script_dir(dir, &version)?;

        let up_path = script_dir.join(UP_SCRIPT);
        if !up_path.is_file() {
            return Err(CoreError::MissingUpScript {
                version: version.to_string(),
                path: up_path.display().to_string(),
            });
        }
        let up = read_script(&up_path)?;
        if up.trim().is_empty() {
            log::warn!("Migration {} has an empty {}", version, UP_SCRIPT);
        }

        let down_path = script_dir.join(DOWN_SCRIPT);
        let down = if down_path.is_file() {
            Some(read_script(&down_path)?)
        } else {
            None
        };

        let name = MigrationUnit::name_from_version(&version);
        Ok(MigrationUnit::new(version, name, up, down).with_origin(dir.to_path_buf()))
    }

    /// Pick the directory holding this engine's scripts for a unit.
    fn script_dir(&self, dir: &Path, version: &VersionIdentifier) -> CoreResult<PathBuf> {
        let mut variants: Vec<String> = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::IoWithPath {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if EngineKind::from_dir_name(name).is_some() {
                    variants.push(name.to_string());
                }
            }
        }

        if variants.is_empty() {
            return Ok(dir.to_path_buf());
        }

        let selected = self.engine.dir_name();
        if variants.iter().any(|v| v == selected) {
            Ok(dir.join(selected))
        } else {
            variants.sort();
            Err(CoreError::MissingEngineVariant {
                version: version.to_string(),
                engine: selected.to_string(),
                available: variants.join(", "),
            })
        }
    }
}

fn read_script(path: &Path) -> CoreResult<String> {
    std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })
}

impl MigrationSource for DirectorySource {
    fn discover(&self) -> CoreResult<Vec<MigrationUnit>> {
        let mut units = Vec::new();
        for root in &self.paths {
            self.discover_in(root, &mut units)?;
        }
        let units = sort_and_check_unique(units)?;
        log::debug!(
            "Discovered {} migration(s) for {} in {} path(s)",
            units.len(),
            self.engine,
            self.paths.len()
        );
        Ok(units)
    }

    fn engine(&self) -> EngineKind {
        self.engine
    }
}

/// A migration compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedMigration {
    /// Version token, e.g. `"20240101000000_create_users"`
    pub version: &'static str,
    /// Apply script
    pub up: &'static str,
    /// Revert script, if the migration is reversible
    pub down: Option<&'static str>,
}

/// Source backed by a static list of migrations for a single engine.
#[derive(Debug, Clone)]
pub struct EmbeddedSource {
    migrations: &'static [EmbeddedMigration],
    engine: EngineKind,
}

impl EmbeddedSource {
    pub fn new(migrations: &'static [EmbeddedMigration], engine: EngineKind) -> Self {
        Self { migrations, engine }
    }
}

impl MigrationSource for EmbeddedSource {
    fn discover(&self) -> CoreResult<Vec<MigrationUnit>> {
        let units = self
            .migrations
            .iter()
            .map(|m| {
                let version = VersionIdentifier::parse(m.version)?;
                let name = MigrationUnit::name_from_version(&version);
                Ok(MigrationUnit::new(
                    version,
                    name,
                    m.up,
                    m.down.map(String::from),
                ))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        sort_and_check_unique(units)
    }

    fn engine(&self) -> EngineKind {
        self.engine
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
