//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from a
//! TOML file layered with `ROOMHUB__`-prefixed environment variables. Each
//! sub-module represents a logical configuration section.

pub mod database;
pub mod lock;
pub mod logging;
pub mod selection;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::lock::{LockConfig, RedisLockConfig, RenewalConfig};
pub use self::logging::LoggingConfig;
pub use self::selection::SelectionConfig;

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "ROOMHUB";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Distributed lock settings.
    #[serde(default)]
    pub lock: LockConfig,
    /// Room selection settings.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file and the environment.
    ///
    /// The file is optional so that a deployment can be configured purely
    /// through variables such as `ROOMHUB__DATABASE__URL`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        Self::finish(config)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        Self::finish(config)
    }

    fn finish(config: config::Config) -> Result<Self, AppError> {
        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        self.database.validate()?;
        self.lock.validate()?;
        self.selection.validate()?;
        if self.selection.write_budget_ms + self.lock.safety_margin_ms >= self.lock.ttl_ms {
            return Err(AppError::configuration(
                "selection.write_budget_ms plus lock.safety_margin_ms must be smaller than lock.ttl_ms",
            ));
        }
        Ok(())
    }
}
