//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use keel_core::{Config, DatabaseConfig, DirectorySource, VersionIdentifier};
use keel_migrate::{Migrator, MigratorOptions, RunResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control-flow only; main.rs prints nothing for it.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// A loaded project: its root directory and parsed config.
pub(crate) struct ProjectContext {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

impl ProjectContext {
    /// Absolute migration directories in configured order.
    pub(crate) fn migration_paths(&self) -> Vec<PathBuf> {
        self.config.migration_paths_absolute(&self.root)
    }

    /// First migration directory; `generate` writes here.
    pub(crate) fn primary_migration_path(&self) -> PathBuf {
        self.migration_paths()
            .into_iter()
            .next()
            .unwrap_or_else(|| self.root.join("migrations"))
    }

    /// Database settings for the selected target.
    ///
    /// A relative database path is resolved against the project root.
    pub(crate) fn database_config(&self, global: &GlobalArgs) -> Result<DatabaseConfig> {
        let target = Config::resolve_target(global.target.as_deref());
        let mut db_config = self
            .config
            .get_database_config(target.as_deref())
            .context("Failed to get database configuration")?;
        db_config.path = resolve_database_path(&self.root, &db_config.path);
        Ok(db_config)
    }
}

/// Load the project config from `--config` or the project directory.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<ProjectContext> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => Config::load_from_dir(&root).context("Failed to load project")?,
    };
    Ok(ProjectContext { root, config })
}

/// `:memory:` and absolute paths pass through; anything else is joined to `root`.
pub(crate) fn resolve_database_path(root: &Path, path: &str) -> String {
    if path == ":memory:" || Path::new(path).is_absolute() {
        path.to_string()
    } else {
        root.join(path).display().to_string()
    }
}

/// Connect to the target database and build a migrator over the project's migrations.
pub(crate) fn create_migrator(
    project: &ProjectContext,
    global: &GlobalArgs,
) -> Result<Migrator> {
    let db_config = project.database_config(global)?;
    let db = keel_db::connect(&db_config).context("Failed to connect to database")?;
    let source = DirectorySource::with_paths(project.migration_paths(), db_config.engine);
    let migrator = Migrator::new(db, Box::new(source))?
        .with_options(MigratorOptions::from_config(&project.config));
    Ok(migrator)
}

/// Parse a `--to` argument.
pub(crate) fn parse_target(raw: Option<&str>) -> Result<Option<VersionIdentifier>> {
    raw.map(VersionIdentifier::parse)
        .transpose()
        .context("Invalid --to version")
}

/// Request cancellation of `migrator`'s run when Ctrl-C arrives.
pub(crate) fn cancel_on_ctrl_c(migrator: &Migrator) {
    let flag = migrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupt received, stopping after the current migration...");
            flag.store(true, Ordering::SeqCst);
        }
    });
}

/// Print a run summary; failed runs return `ExitCode(1)`.
pub(crate) fn report_run(result: RunResult, verb: &str) -> Result<()> {
    for version in &result.applied {
        println!("  {verb} {version}");
    }

    match result.error {
        None => {
            if result.applied.is_empty() {
                println!("Nothing to do.");
            } else {
                println!(
                    "\n{} migration(s) {} in {:.2}s",
                    result.applied.len(),
                    verb.to_lowercase(),
                    result.elapsed.as_secs_f64()
                );
            }
            Ok(())
        }
        Some(err) => {
            if let Some(version) = &result.failed_at {
                eprintln!("\nMigration {version} failed.");
            }
            eprintln!("Error: {err}");
            if !result.applied.is_empty() {
                eprintln!(
                    "{} migration(s) were committed before the failure.",
                    result.applied.len()
                );
            }
            if err.is_cancelled() {
                eprintln!("Run the command again to continue.");
            }
            Err(ExitCode(1).into())
        }
    }
}

/// Calculate column widths for table output.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Print a formatted table to stdout.
///
/// Columns are left-aligned and separated by two spaces, with a dashed
/// line under the header row.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  ").trim_end());

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  ").trim_end());
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
