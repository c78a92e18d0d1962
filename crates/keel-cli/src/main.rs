//! Keel CLI - versioned SQL schema migrations

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands, GlobalArgs};
use commands::common::ExitCode;
use commands::{migration, setup};

fn init_logging(global: &GlobalArgs) {
    let default_level = match (&global.log_level, global.verbose) {
        (Some(level), _) => level.as_str(),
        (None, true) => "debug",
        (None, false) => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.global);

    let result = match &cli.command {
        Commands::Setup(args) => setup::execute(args, &cli.global).await,
        Commands::Migration(command) => migration::execute(command, &cli.global).await,
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(code) => std::process::ExitCode::from(code.0.clamp(1, 255) as u8),
            None => {
                eprintln!("Error: {err:#}");
                std::process::ExitCode::FAILURE
            }
        },
    }
}
