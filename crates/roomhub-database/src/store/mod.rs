//! The durable store the selection allocator runs against.
//!
//! Each method is atomic on its own; nothing here spans statements. Callers
//! that need a multi-step read-check-write sequence serialize it externally
//! with the distributed lock.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use roomhub_core::result::AppResult;
use roomhub_entity::room::Room;
use roomhub_entity::selection::Selection;

pub use memory::{MemoryRoomStore, StoreOperation};
pub use postgres::PgRoomStore;

/// Room and selection persistence.
#[async_trait]
pub trait RoomStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a room by id, optionally restricted to available rooms.
    async fn find_room(&self, room_id: &str, available_only: bool) -> AppResult<Option<Room>>;

    /// Find rooms scheduled in `[start, end)`.
    async fn find_rooms_by_time_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        available_only: bool,
    ) -> AppResult<Vec<Room>>;

    /// List every room.
    async fn list_rooms(&self, available_only: bool) -> AppResult<Vec<Room>>;

    /// Find the selection of a user.
    async fn find_selection(&self, openid: &str) -> AppResult<Option<Selection>>;

    /// Insert a selection for a user who has none.
    async fn create_selection(&self, openid: &str, room_id: &str) -> AppResult<Selection>;

    /// Delete the user's selection of `room_id`. Returns `true` if one existed.
    async fn delete_selection(&self, openid: &str, room_id: &str) -> AppResult<bool>;

    /// Overwrite the occupancy counter of a room.
    async fn update_room_occupancy(&self, room_id: &str, occupancy: i32) -> AppResult<()>;

    /// Count the selections referencing a room.
    async fn count_selections(&self, room_id: &str) -> AppResult<i64>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
