//! Migration command implementations

use anyhow::{Context, Result};
use chrono::Utc;
use keel_core::{scaffold, EngineKind};
use keel_migrate::{Direction, MigrationStatus, Plan, UnitState};
use serde::Serialize;

use crate::cli::{
    GenerateArgs, GlobalArgs, MigrationCommands, OutputFormat, RollbackArgs, RunArgs, StatusArgs,
};
use crate::commands::common::{
    cancel_on_ctrl_c, create_migrator, load_project, parse_target, print_table, report_run,
};

/// Dispatch a migration subcommand
pub async fn execute(command: &MigrationCommands, global: &GlobalArgs) -> Result<()> {
    match command {
        MigrationCommands::Generate(args) => generate(args, global),
        MigrationCommands::Run(args) => run(args, global).await,
        MigrationCommands::Rollback(args) => rollback(args, global).await,
        MigrationCommands::Status(args) => status(args, global).await,
        MigrationCommands::Unlock => unlock(global).await,
    }
}

fn generate(args: &GenerateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let engine = match args.engine {
        Some(engine) => EngineKind::from(engine),
        None => project.database_config(global)?.engine,
    };

    let generated = scaffold::generate(
        &project.primary_migration_path(),
        &args.name,
        engine,
        Utc::now(),
        args.dry_run,
    )
    .context("Failed to generate migration")?;

    if args.dry_run {
        println!("Dry run - would create migration {}:", generated.version);
    } else {
        println!("Created migration {}:", generated.version);
    }
    println!("  {}", generated.up_path.display());
    println!("  {}", generated.down_path.display());
    Ok(())
}

async fn run(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let target = parse_target(args.to.as_deref())?;
    let migrator = create_migrator(&project, global)?;

    if args.dry_run {
        let plan = migrator
            .plan(Direction::Up, target.as_ref())
            .await
            .context("Failed to plan migrations")?;
        print_plan(&plan);
        return Ok(());
    }

    cancel_on_ctrl_c(&migrator);
    let result = migrator.run(Direction::Up, target.as_ref()).await;
    report_run(result, "Applied")
}

async fn rollback(args: &RollbackArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let target = parse_target(args.to.as_deref())?;
    let migrator = create_migrator(&project, global)?;

    if args.dry_run {
        let plan = migrator
            .plan(Direction::Down, target.as_ref())
            .await
            .context("Failed to plan rollback")?;
        print_plan(&plan);
        return Ok(());
    }

    cancel_on_ctrl_c(&migrator);
    let result = migrator.run(Direction::Down, target.as_ref()).await;
    report_run(result, "Reverted")
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("Dry run - nothing to {}.", plan.direction);
        return;
    }
    let verb = match plan.direction {
        Direction::Up => "apply",
        Direction::Down => "revert",
    };
    println!("Dry run - would {} {} migration(s):", verb, plan.len());
    for step in &plan.steps {
        println!("  {}  {}", step.version, step.name);
    }
}

/// JSON shape of `migration status --output json`
#[derive(Serialize)]
struct StatusReport<'a> {
    applied: usize,
    pending: usize,
    orphaned: usize,
    migrations: &'a [MigrationStatus],
}

async fn status(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let migrator = create_migrator(&project, global)?;
    let rows = migrator
        .status()
        .await
        .context("Failed to read migration status")?;

    let applied = count_state(&rows, |s| matches!(s, UnitState::Applied { .. }));
    let pending = count_state(&rows, |s| matches!(s, UnitState::Pending));
    let orphaned = count_state(&rows, |s| matches!(s, UnitState::Orphaned { .. }));

    match args.output {
        OutputFormat::Json => {
            let report = StatusReport {
                applied,
                pending,
                orphaned,
                migrations: &rows,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No migrations found.");
                return Ok(());
            }
            let table: Vec<Vec<String>> = rows.iter().map(status_row).collect();
            print_table(&["VERSION", "NAME", "STATE", "APPLIED AT", "REVERSIBLE"], &table);
            println!(
                "\n{} applied, {} pending, {} orphaned",
                applied, pending, orphaned
            );
        }
    }
    Ok(())
}

fn count_state(rows: &[MigrationStatus], pred: impl Fn(&UnitState) -> bool) -> usize {
    rows.iter().filter(|r| pred(&r.state)).count()
}

fn status_row(row: &MigrationStatus) -> Vec<String> {
    let (state, applied_at) = match &row.state {
        UnitState::Applied { applied_at } => ("applied", applied_at.to_string()),
        UnitState::Pending => ("pending", String::new()),
        UnitState::Orphaned { applied_at } => ("orphaned", applied_at.to_string()),
    };
    vec![
        row.version.to_string(),
        row.name.clone(),
        state.to_string(),
        applied_at,
        if row.reversible { "yes" } else { "no" }.to_string(),
    ]
}

async fn unlock(global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let migrator = create_migrator(&project, global)?;

    if migrator
        .force_unlock()
        .await
        .context("Failed to clear migration lock")?
    {
        println!("Cleared migration lock.");
    } else {
        println!("No migration lock was held.");
    }
    Ok(())
}
