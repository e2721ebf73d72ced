//! CLI command definitions and dispatch.

pub mod health;
pub mod migrate;
pub mod room;
pub mod selection;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::output::OutputFormat;
use roomhub_core::config::AppConfig;
use roomhub_core::error::AppError;
use roomhub_database::{DatabasePool, PgRoomStore};
use roomhub_lock::{DistributedLock, LeaseStoreManager};

/// RoomHub — interview room selection
#[derive(Debug, Parser)]
#[command(name = "roomhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Room listing and maintenance
    Room(room::RoomArgs),
    /// Per-user room selection
    Selection(selection::SelectionArgs),
    /// Check database and lock backend connectivity
    Health,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Room(args) => room::execute(args, &config, self.format).await,
            Commands::Selection(args) => selection::execute(args, &config, self.format).await,
            Commands::Health => health::execute(&config).await,
        }
    }
}

/// Helper: load configuration from file and environment
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: connect the PostgreSQL room store
pub async fn connect_store(config: &AppConfig) -> Result<Arc<PgRoomStore>, AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    Ok(Arc::new(PgRoomStore::new(pool)))
}

/// Helper: build the selection lock over the configured lease store
pub async fn build_lock(config: &AppConfig) -> Result<Arc<DistributedLock>, AppError> {
    let leases = LeaseStoreManager::new(&config.lock).await?;
    Ok(Arc::new(DistributedLock::from_config(
        leases.store(),
        &config.lock,
    )))
}

/// Helper: a token that fires on Ctrl-C, used to abandon lock waits
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            trigger.cancel();
        }
    });
    token
}
