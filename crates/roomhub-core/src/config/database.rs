//! PostgreSQL settings for the room and selection tables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Connection settings for the database holding rooms and selections.
///
/// Selection writes are serialized by the selection lock, so a process
/// rarely needs more than a handful of connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a free connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    /// Server-side limit on a single statement, in ms.
    ///
    /// Keep well below `selection.write_budget_ms` so one stuck write cannot
    /// consume the whole budget.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_ms: u64,
    /// Name reported in `pg_stat_activity`.
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    /// Reject an empty URL and an inverted pool range.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.url.trim().is_empty() {
            return Err(AppError::configuration("database.url must not be empty"));
        }
        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(AppError::configuration(
                "database.max_connections must be positive and not below database.min_connections",
            ));
        }
        if self.statement_timeout_ms == 0 {
            return Err(AppError::configuration(
                "database.statement_timeout_ms must be positive",
            ));
        }
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    8
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_statement_timeout() -> u64 {
    1000
}

fn default_application_name() -> String {
    "roomhub".to_string()
}
