//! PostgreSQL-backed room store.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::warn;

use roomhub_core::error::AppError;
use roomhub_core::result::AppResult;
use roomhub_entity::room::Room;
use roomhub_entity::selection::Selection;

use super::RoomStore;
use crate::connection::DatabasePool;
use crate::repositories::{RoomRepository, SelectionRepository};

/// Room store composed from the room and selection repositories.
#[derive(Debug, Clone)]
pub struct PgRoomStore {
    db: DatabasePool,
    rooms: RoomRepository,
    selections: SelectionRepository,
}

impl PgRoomStore {
    /// Create a store over an existing pool.
    pub fn new(db: DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            db,
            rooms: RoomRepository::new(pool.clone()),
            selections: SelectionRepository::new(pool),
        }
    }

    /// The room repository.
    pub fn rooms(&self) -> &RoomRepository {
        &self.rooms
    }

    /// The selection repository.
    pub fn selections(&self) -> &SelectionRepository {
        &self.selections
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn find_room(&self, room_id: &str, available_only: bool) -> AppResult<Option<Room>> {
        self.rooms.find_by_room_id(room_id, available_only).await
    }

    async fn find_rooms_by_time_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        available_only: bool,
    ) -> AppResult<Vec<Room>> {
        self.rooms
            .find_by_time_range(start, end, available_only)
            .await
    }

    async fn list_rooms(&self, available_only: bool) -> AppResult<Vec<Room>> {
        self.rooms.find_all(available_only).await
    }

    async fn find_selection(&self, openid: &str) -> AppResult<Option<Selection>> {
        self.selections.find_by_openid(openid).await
    }

    async fn create_selection(&self, openid: &str, room_id: &str) -> AppResult<Selection> {
        self.selections.create(openid, room_id).await
    }

    async fn delete_selection(&self, openid: &str, room_id: &str) -> AppResult<bool> {
        self.selections.delete(openid, room_id).await
    }

    async fn update_room_occupancy(&self, room_id: &str, occupancy: i32) -> AppResult<()> {
        let updated = self.rooms.update_occupancy(room_id, occupancy).await?;
        if updated == 0 {
            warn!(room_id = %room_id, "Occupancy update matched no room");
            return Err(AppError::not_found(format!("Room {room_id} not found")));
        }
        Ok(())
    }

    async fn count_selections(&self, room_id: &str) -> AppResult<i64> {
        self.selections.count_by_room(room_id).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.db.health_check().await
    }
}
