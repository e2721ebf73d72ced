//! Database migration commands.

use clap::{Args, Subcommand};

use crate::output;
use roomhub_core::config::AppConfig;
use roomhub_core::error::AppError;
use roomhub_database::DatabasePool;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Migrating room schema...");
            let version = roomhub_database::migration::run_migrations(&pool).await?;
            output::print_success(&format!("Room schema at version {version}."));
        }
    }

    pool.close().await;
    Ok(())
}
