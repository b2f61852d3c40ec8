//! faves - favorite catalogs and products from the terminal

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::catalog::run_catalog;
use crate::commands::common::{open_session, resolve_db_path, ApiAccess};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::favorite::{run_add, run_remove, run_toggle};
use crate::commands::list::run_list;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::config_profiles::default_config_path;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "faves=info".parse::<tracing_subscriber::filter::Directive>() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => {
            let config_path = default_config_path().map_err(CliError::Config)?;
            run_config(command, profile, &config_path)
        }
        Commands::Auth { command } => run_auth(command, profile),
        command => {
            let db_path = resolve_db_path(cli.db_path)?;
            // Listing and status can fall back to the local cache.
            let access = match command {
                Commands::List { .. } | Commands::Status { .. } => ApiAccess::Optional,
                _ => ApiAccess::Required,
            };
            let session = open_session(&db_path, profile, access).await?;
            let engine = &session.engine;
            match command {
                Commands::Toggle { kind, id } => run_toggle(engine, kind.into(), &id).await,
                Commands::Add { kind, id } => run_add(engine, kind.into(), &id).await,
                Commands::Remove { kind, id } => run_remove(engine, kind.into(), &id).await,
                Commands::List { kind, sync, json } => {
                    run_list(engine, kind.map(Into::into), sync, json).await
                }
                Commands::Sync => run_sync(engine).await,
                Commands::Status { sync, json } => run_status(&session, sync, json).await,
                Commands::Catalog { id, json } => run_catalog(engine, &id, json).await,
                Commands::Completions { .. } | Commands::Config { .. } | Commands::Auth { .. } => {
                    Ok(())
                }
            }
        }
    }
}
