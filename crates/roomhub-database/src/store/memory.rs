//! In-memory room store using a Tokio mutex.
//!
//! Suitable for single-process deployments and tests. Optional per-call
//! latency and one-shot failure injection let tests reproduce slow or
//! failing infrastructure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use roomhub_core::error::AppError;
use roomhub_core::result::AppResult;
use roomhub_entity::room::Room;
use roomhub_entity::selection::Selection;

use super::RoomStore;

/// Store operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `find_room`
    FindRoom,
    /// `find_selection`
    FindSelection,
    /// `create_selection`
    CreateSelection,
    /// `delete_selection`
    DeleteSelection,
    /// `update_room_occupancy`
    UpdateOccupancy,
}

/// Internal state for the memory-based store.
#[derive(Debug, Default)]
struct InnerState {
    /// Rooms keyed by room id.
    rooms: HashMap<String, Room>,
    /// Selections keyed by openid.
    selections: HashMap<String, Selection>,
    /// Operations that fail on their next call.
    pending_failures: Vec<StoreOperation>,
}

impl InnerState {
    fn take_failure(&mut self, op: StoreOperation) -> AppResult<()> {
        if let Some(pos) = self.pending_failures.iter().position(|p| *p == op) {
            self.pending_failures.remove(pos);
            return Err(AppError::database(format!("Injected failure in {op:?}")));
        }
        Ok(())
    }
}

/// In-memory room store.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoomStore {
    /// Protected inner state.
    state: Arc<Mutex<InnerState>>,
    /// Artificial delay applied before every store call.
    latency: Duration,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose calls each take `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Insert or replace a room.
    pub async fn insert_room(&self, room: Room) {
        let mut state = self.state.lock().await;
        state.rooms.insert(room.room_id.clone(), room);
    }

    /// Toggle the availability of a room. Returns `false` if it does not exist.
    pub async fn set_available(&self, room_id: &str, available: bool) -> bool {
        let mut state = self.state.lock().await;
        match state.rooms.get_mut(room_id) {
            Some(room) => {
                room.available = available;
                true
            }
            None => false,
        }
    }

    /// Make the next call of `op` fail with a database error.
    pub async fn fail_next(&self, op: StoreOperation) {
        self.state.lock().await.pending_failures.push(op);
    }

    /// Snapshot of all selections.
    pub async fn selections(&self) -> Vec<Selection> {
        self.state.lock().await.selections.values().cloned().collect()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn find_room(&self, room_id: &str, available_only: bool) -> AppResult<Option<Room>> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.take_failure(StoreOperation::FindRoom)?;
        Ok(state
            .rooms
            .get(room_id)
            .filter(|room| !available_only || room.available)
            .cloned())
    }

    async fn find_rooms_by_time_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        available_only: bool,
    ) -> AppResult<Vec<Room>> {
        self.delay().await;
        let state = self.state.lock().await;
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|room| room.scheduled_time >= start && room.scheduled_time < end)
            .filter(|room| !available_only || room.available)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| {
            (a.scheduled_time, &a.room_id).cmp(&(b.scheduled_time, &b.room_id))
        });
        Ok(rooms)
    }

    async fn list_rooms(&self, available_only: bool) -> AppResult<Vec<Room>> {
        self.delay().await;
        let state = self.state.lock().await;
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|room| !available_only || room.available)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| {
            (a.scheduled_time, &a.room_id).cmp(&(b.scheduled_time, &b.room_id))
        });
        Ok(rooms)
    }

    async fn find_selection(&self, openid: &str) -> AppResult<Option<Selection>> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.take_failure(StoreOperation::FindSelection)?;
        Ok(state.selections.get(openid).cloned())
    }

    async fn create_selection(&self, openid: &str, room_id: &str) -> AppResult<Selection> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.take_failure(StoreOperation::CreateSelection)?;

        if state.selections.contains_key(openid) {
            return Err(AppError::conflict(format!(
                "Selection for {openid} already exists"
            )));
        }
        if !state.rooms.contains_key(room_id) {
            return Err(AppError::database(format!(
                "Selection references unknown room {room_id}"
            )));
        }

        let selection = Selection {
            openid: openid.to_string(),
            room_id: room_id.to_string(),
            created_at: Utc::now(),
        };
        state
            .selections
            .insert(openid.to_string(), selection.clone());
        debug!(openid = %openid, room_id = %room_id, "Selection stored");
        Ok(selection)
    }

    async fn delete_selection(&self, openid: &str, room_id: &str) -> AppResult<bool> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.take_failure(StoreOperation::DeleteSelection)?;

        let matches = state
            .selections
            .get(openid)
            .is_some_and(|selection| selection.room_id == room_id);
        if matches {
            state.selections.remove(openid);
        }
        Ok(matches)
    }

    async fn update_room_occupancy(&self, room_id: &str, occupancy: i32) -> AppResult<()> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.take_failure(StoreOperation::UpdateOccupancy)?;

        let room = state
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| AppError::not_found(format!("Room {room_id} not found")))?;
        // Mirrors the CHECK constraint on the rooms table.
        if occupancy < 0 || occupancy > room.capacity {
            return Err(AppError::database(format!(
                "Occupancy {occupancy} out of bounds for room {room_id} (capacity {})",
                room.capacity
            )));
        }
        room.occupancy = occupancy;
        Ok(())
    }

    async fn count_selections(&self, room_id: &str) -> AppResult<i64> {
        self.delay().await;
        let state = self.state.lock().await;
        Ok(state
            .selections
            .values()
            .filter(|selection| selection.room_id == room_id)
            .count() as i64)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
