//! Room repository implementation.

use chrono::NaiveDateTime;
use sqlx::PgPool;

use roomhub_core::error::{AppError, ErrorKind};
use roomhub_core::result::AppResult;
use roomhub_entity::room::Room;

const ROOM_COLUMNS: &str =
    "room_id, name, scheduled_time, capacity, occupancy, location, available";

/// Repository for room lookups and occupancy updates.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    pool: PgPool,
}

impl RoomRepository {
    /// Create a new room repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a room by its public identifier.
    pub async fn find_by_room_id(
        &self,
        room_id: &str,
        available_only: bool,
    ) -> AppResult<Option<Room>> {
        sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms \
             WHERE room_id = $1 AND deleted_at IS NULL AND ($2 = FALSE OR available = TRUE)"
        ))
        .bind(room_id)
        .bind(available_only)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find room", e))
    }

    /// Find rooms scheduled in `[start, end)`.
    pub async fn find_by_time_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        available_only: bool,
    ) -> AppResult<Vec<Room>> {
        sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms \
             WHERE scheduled_time >= $1 AND scheduled_time < $2 \
               AND deleted_at IS NULL AND ($3 = FALSE OR available = TRUE) \
             ORDER BY scheduled_time, room_id"
        ))
        .bind(start)
        .bind(end)
        .bind(available_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find rooms by time range", e)
        })
    }

    /// List every room.
    pub async fn find_all(&self, available_only: bool) -> AppResult<Vec<Room>> {
        sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms \
             WHERE deleted_at IS NULL AND ($1 = FALSE OR available = TRUE) \
             ORDER BY scheduled_time, room_id"
        ))
        .bind(available_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list rooms", e))
    }

    /// Overwrite the occupancy counter of a room.
    ///
    /// Returns the number of rows updated.
    pub async fn update_occupancy(&self, room_id: &str, occupancy: i32) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE rooms SET occupancy = $2, updated_at = NOW() \
             WHERE room_id = $1 AND deleted_at IS NULL",
        )
        .bind(room_id)
        .bind(occupancy)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update room occupancy", e)
        })?;
        Ok(result.rows_affected())
    }
}
