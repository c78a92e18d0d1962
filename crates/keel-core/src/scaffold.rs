//! Project and migration scaffolding.
//!
//! `setup` lays down `keel.yml` and the bootstrap migration; `generate`
//! creates a new timestamped migration directory for one engine. Both render
//! their files through minijinja.

use crate::config::{EngineKind, CONFIG_FILE_NAMES};
use crate::error::{CoreError, CoreResult};
use crate::source::{DOWN_SCRIPT, UP_SCRIPT};
use crate::templates::{
    bootstrap_sql, BOOTSTRAP_MIGRATION, CONFIG_TEMPLATE, DOWN_TEMPLATE, UP_TEMPLATE,
};
use crate::version::VersionIdentifier;
use chrono::{DateTime, Utc};
use minijinja::{context, Environment};
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp format used for generated migration versions.
pub const VERSION_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// What `setup` wrote and what it left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub config_path: PathBuf,
    pub config_written: bool,
    pub bootstrap_path: PathBuf,
    pub bootstrap_written: bool,
}

/// Write `keel.yml` and the bootstrap migration into `project_dir`.
///
/// Existing files are never overwritten; the report says which were skipped.
pub fn setup(
    project_dir: &Path,
    engine: EngineKind,
    database_path: &str,
) -> CoreResult<SetupReport> {
    fs::create_dir_all(project_dir).map_err(|e| CoreError::IoWithPath {
        path: project_dir.display().to_string(),
        source: e,
    })?;

    let existing_config = CONFIG_FILE_NAMES
        .iter()
        .map(|n| project_dir.join(n))
        .find(|p| p.exists());
    let (config_path, config_written) = match existing_config {
        Some(path) => {
            log::info!("{} already exists, leaving it untouched", path.display());
            (path, false)
        }
        None => {
            let path = project_dir.join(CONFIG_FILE_NAMES[0]);
            let name = project_name(project_dir);
            let content = Environment::new().render_str(
                CONFIG_TEMPLATE,
                context! {
                    name => name.replace('"', "\\\""),
                    engine => engine.dir_name(),
                    database_path => database_path.replace('"', "\\\""),
                },
            )?;
            write_file(&path, &content)?;
            (path, true)
        }
    };

    let bootstrap_dir = project_dir
        .join("migrations")
        .join(BOOTSTRAP_MIGRATION)
        .join(engine.dir_name());
    let bootstrap_path = bootstrap_dir.join(UP_SCRIPT);
    let bootstrap_written = if bootstrap_path.exists() {
        log::info!(
            "{} already exists, leaving it untouched",
            bootstrap_path.display()
        );
        false
    } else {
        fs::create_dir_all(&bootstrap_dir).map_err(|e| CoreError::IoWithPath {
            path: bootstrap_dir.display().to_string(),
            source: e,
        })?;
        write_file(&bootstrap_path, bootstrap_sql(engine))?;
        true
    };

    Ok(SetupReport {
        config_path,
        config_written,
        bootstrap_path,
        bootstrap_written,
    })
}

fn project_name(project_dir: &Path) -> String {
    project_dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
        .unwrap_or_else(|| "keel_project".to_string())
}

/// A migration created (or, in dry-run mode, planned) by `generate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMigration {
    pub version: VersionIdentifier,
    pub dir: PathBuf,
    pub up_path: PathBuf,
    pub down_path: PathBuf,
    pub written: bool,
}

/// Create `<migrations_dir>/<timestamp>_<name>/<engine>/{up,down}.sql`.
///
/// With `dry_run` the paths are computed and returned but nothing is written.
pub fn generate(
    migrations_dir: &Path,
    name: &str,
    engine: EngineKind,
    now: DateTime<Utc>,
    dry_run: bool,
) -> CoreResult<GeneratedMigration> {
    let label = normalize_name(name)?;
    let raw = format!("{}_{}", now.format(VERSION_TIMESTAMP_FORMAT), label);
    let version = VersionIdentifier::parse(&raw).map_err(|e| CoreError::GenerateRefused {
        reason: e.to_string(),
    })?;

    let dir = migrations_dir.join(version.as_str());
    let script_dir = dir.join(engine.dir_name());
    let up_path = script_dir.join(UP_SCRIPT);
    let down_path = script_dir.join(DOWN_SCRIPT);

    if script_dir.exists() {
        return Err(CoreError::GenerateRefused {
            reason: format!("'{}' already exists", script_dir.display()),
        });
    }

    let mut generated = GeneratedMigration {
        version,
        dir,
        up_path,
        down_path,
        written: false,
    };
    if dry_run {
        return Ok(generated);
    }

    let env = Environment::new();
    let ctx = context! {
        name => name.trim(),
        version => generated.version.as_str(),
        engine => engine.dir_name(),
        created_at => now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    };
    let up = env.render_str(UP_TEMPLATE, &ctx)?;
    let down = env.render_str(DOWN_TEMPLATE, &ctx)?;

    fs::create_dir_all(&script_dir).map_err(|e| CoreError::IoWithPath {
        path: script_dir.display().to_string(),
        source: e,
    })?;
    write_file(&generated.up_path, &up)?;
    write_file(&generated.down_path, &down)?;
    generated.written = true;

    log::info!("Generated migration {}", generated.version);
    Ok(generated)
}

/// Turn a human name into a version label (`Add Users` -> `add_users`).
fn normalize_name(name: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
        || trimmed.starts_with('.')
        || trimmed.starts_with('-')
    {
        return Err(CoreError::GenerateRefused {
            reason: format!(
                "invalid migration name '{}': must be non-empty, must not contain '/', '\\', '..', or start with '.' or '-'",
                name
            ),
        });
    }

    Ok(trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase())
}

fn write_file(path: &Path, content: &str) -> CoreResult<()> {
    fs::write(path, content).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
#[path = "scaffold_test.rs"]
mod tests;
