//! Roster CLI - reconcile an external people roster from the command line
//!
//! `roster compare` shows what would change, `roster sync` applies it.

mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{exit_code, open_service};
use crate::commands::compare::run_compare;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::departments::run_departments;
use crate::commands::people::run_people;
use crate::commands::sync::{run_sync, SyncSource};
use crate::config::{default_config_path, env_lookup, resolve_db_path, RosterConfig};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<i32, CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roster=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = default_config_path();
    let lookup = env_lookup();
    let mut config = RosterConfig::load_from_path(&config_path).map_err(CliError::Config)?;
    config.apply_env(&lookup).map_err(CliError::Config)?;
    let db_path = resolve_db_path(cli.db_path, &lookup, &config);

    match cli.command {
        Commands::Compare { csv, json, output } => {
            let service = open_service(&db_path, config.policy).await?;
            run_compare(&service, &csv, json, output.as_deref()).await?;
        }
        Commands::Sync {
            decisions,
            from_csv,
            include_deletions,
            json,
        } => {
            let source = match (from_csv.as_deref(), decisions.as_deref()) {
                (Some(path), _) => SyncSource::Csv {
                    path,
                    include_deletions,
                },
                (None, Some(path)) => SyncSource::Decisions(path),
                (None, None) => return Err(CliError::NothingToSync),
            };
            let service = open_service(&db_path, config.policy).await?;
            let report = run_sync(&service, source, json).await?;
            return Ok(exit_code(&report));
        }
        Commands::People { json } => {
            let service = open_service(&db_path, config.policy).await?;
            run_people(&service, json).await?;
        }
        Commands::Departments { command } => {
            let service = open_service(&db_path, config.policy).await?;
            run_departments(&service, command).await?;
        }
        Commands::Config { command } => run_config(command, &config_path, &db_path)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(0)
}
