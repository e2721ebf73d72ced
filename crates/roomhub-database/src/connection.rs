//! PostgreSQL pool for the room and selection tables.

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{info, warn};

use roomhub_core::config::DatabaseConfig;
use roomhub_core::error::{AppError, ErrorKind};

/// Tables every RoomHub operation reads or writes.
const REQUIRED_TABLES: [&str; 2] = ["rooms", "selections"];

/// Wrapper around the sqlx PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Open a pool tagged with the configured application name and
    /// statement timeout.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = connect_options(config)?;
        info!(
            host = %options.get_host(),
            port = options.get_port(),
            database = options.get_database().unwrap_or("<default>"),
            application = %config.application_name,
            max_connections = config.max_connections,
            statement_timeout_ms = config.statement_timeout_ms,
            "Connecting to room database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to room database: {e}"),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Whether the database answers and holds the `rooms` and `selections` tables.
    pub async fn health_check(&self) -> Result<bool, AppError> {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name::text = ANY($1)",
        )
        .bind(&REQUIRED_TABLES[..])
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))?;

        let ready = found == REQUIRED_TABLES.len() as i64;
        if !ready {
            warn!(
                found,
                expected = REQUIRED_TABLES.len(),
                "Room schema incomplete; run `roomhub migrate run`"
            );
        }
        Ok(ready)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Room database pool closed");
    }
}

/// Parse the URL and apply the RoomHub session settings.
fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, AppError> {
    let options = PgConnectOptions::from_str(&config.url).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            "Invalid database.url",
            e,
        )
    })?;
    Ok(options
        .application_name(&config.application_name)
        .options([(
            "statement_timeout",
            format!("{}ms", config.statement_timeout_ms),
        )]))
}
