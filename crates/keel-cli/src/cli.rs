//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use keel_core::EngineKind;

/// Keel - versioned SQL schema migrations
#[derive(Parser, Debug)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace); overrides --verbose
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override target (database connection)
    #[arg(short, long, global = true, env = "KEEL_TARGET")]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write keel.yml and the bootstrap migration for a new project
    Setup(SetupArgs),

    /// Generate, apply, revert, and inspect migrations
    #[command(subcommand)]
    Migration(MigrationCommands),
}

/// Arguments for the setup command
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Database engine the project targets
    #[arg(short, long, value_enum, default_value = "sqlite")]
    pub engine: EngineArg,

    /// Database file path written into keel.yml
    #[arg(long, default_value = "keel.db")]
    pub database_path: String,
}

/// Migration subcommands
#[derive(Subcommand, Debug)]
pub enum MigrationCommands {
    /// Create a new timestamped migration directory
    Generate(GenerateArgs),

    /// Apply pending migrations
    Run(RunArgs),

    /// Revert applied migrations
    Rollback(RollbackArgs),

    /// Show applied, pending, and orphaned migrations
    Status(StatusArgs),

    /// Clear a run lock left behind by a crashed process
    Unlock,
}

/// Arguments for migration generate
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Migration name, e.g. "create users"
    pub name: String,

    /// Engine to write scripts for (default: the configured engine)
    #[arg(short, long, value_enum)]
    pub engine: Option<EngineArg>,

    /// Print what would be created without writing files
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for migration run
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after applying this version
    #[arg(long)]
    pub to: Option<String>,

    /// Print the plan without executing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for migration rollback
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Revert every applied migration down to and including this version
    /// (default: only the most recent one)
    #[arg(long)]
    pub to: Option<String>,

    /// Print the plan without executing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for migration status
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON output
    Json,
}

/// Database engines selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineArg {
    Sqlite,
    #[value(name = "duckdb")]
    DuckDb,
    Postgres,
    #[value(name = "mysql")]
    MySql,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Sqlite => EngineKind::Sqlite,
            EngineArg::DuckDb => EngineKind::DuckDb,
            EngineArg::Postgres => EngineKind::Postgres,
            EngineArg::MySql => EngineKind::MySql,
        }
    }
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
