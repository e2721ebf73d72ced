//! Selection repository implementation.

use sqlx::PgPool;

use roomhub_core::error::{AppError, ErrorKind};
use roomhub_core::result::AppResult;
use roomhub_entity::selection::Selection;

/// Repository for per-user room selections.
#[derive(Debug, Clone)]
pub struct SelectionRepository {
    pool: PgPool,
}

impl SelectionRepository {
    /// Create a new selection repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the selection of a user.
    pub async fn find_by_openid(&self, openid: &str) -> AppResult<Option<Selection>> {
        sqlx::query_as::<_, Selection>(
            "SELECT openid, room_id, created_at FROM selections WHERE openid = $1",
        )
        .bind(openid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find selection", e))
    }

    /// Insert a selection. Fails with a conflict if the user already has one.
    pub async fn create(&self, openid: &str, room_id: &str) -> AppResult<Selection> {
        sqlx::query_as::<_, Selection>(
            "INSERT INTO selections (openid, room_id) VALUES ($1, $2) \
             RETURNING openid, room_id, created_at",
        )
        .bind(openid)
        .bind(room_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let kind = match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::Conflict,
                _ => ErrorKind::Database,
            };
            AppError::with_source(kind, "Failed to create selection", e)
        })
    }

    /// Delete the selection of a user for the given room.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(&self, openid: &str, room_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM selections WHERE openid = $1 AND room_id = $2")
            .bind(openid)
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete selection", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// Count the selections referencing a room.
    pub async fn count_by_room(&self, room_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM selections WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count selections", e)
            })
    }
}
