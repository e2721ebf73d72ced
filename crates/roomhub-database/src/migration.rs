//! Schema migrations for the room and selection tables.

use sqlx::migrate::Migrator;
use tracing::info;

use roomhub_core::error::{AppError, ErrorKind};

use crate::connection::DatabasePool;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Version of the newest bundled migration.
pub fn latest_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

/// Apply pending migrations and confirm the room schema is present.
///
/// Returns the schema version now in place.
pub async fn run_migrations(db: &DatabasePool) -> Result<i64, AppError> {
    let target = latest_version().unwrap_or_default();
    info!(
        bundled = MIGRATOR.iter().count(),
        target, "Migrating room schema"
    );

    MIGRATOR.run(db.pool()).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to migrate room schema: {e}"),
            e,
        )
    })?;

    if !db.health_check().await? {
        return Err(AppError::database(
            "Migrations ran but the rooms and selections tables are missing",
        ));
    }

    info!(version = target, "Room schema up to date");
    Ok(target)
}
