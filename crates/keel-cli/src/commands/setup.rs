//! Setup command implementation

use anyhow::{Context, Result};
use keel_core::scaffold;
use keel_core::EngineKind;
use std::path::Path;

use crate::cli::{GlobalArgs, SetupArgs};

/// Execute the setup command
pub async fn execute(args: &SetupArgs, global: &GlobalArgs) -> Result<()> {
    let project_dir = Path::new(&global.project_dir);
    let engine = EngineKind::from(args.engine);

    println!("Setting up Keel project in {}", project_dir.display());
    let report = scaffold::setup(project_dir, engine, &args.database_path)
        .context("Failed to set up project")?;

    let describe = |written: bool| if written { "Created" } else { "Exists " };
    println!(
        "  {} {}",
        describe(report.config_written),
        report.config_path.display()
    );
    println!(
        "  {} {}",
        describe(report.bootstrap_written),
        report.bootstrap_path.display()
    );

    if report.config_written || report.bootstrap_written {
        println!("\nNext: keel migration generate <name>, then keel migration run");
    } else {
        println!("\nProject was already set up; nothing changed.");
    }
    Ok(())
}
