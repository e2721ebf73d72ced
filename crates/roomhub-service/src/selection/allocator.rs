//! Room selection allocator.
//!
//! Every mutation runs its read-check-write sequence while holding the
//! selection lock. The lease is checked once, after the reads, against the
//! configured write budget. Once the first write lands the sequence runs to
//! completion, so a switch never stops halfway because the lease ran short.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use roomhub_core::config::selection::SelectionConfig;
use roomhub_core::error::AppError;
use roomhub_database::store::RoomStore;
use roomhub_entity::room::Room;
use roomhub_entity::selection::Selection;
use roomhub_lock::{DistributedLock, LockGuard};

use crate::error::SelectionError;

/// Assigns users to rooms without overbooking.
#[derive(Debug, Clone)]
pub struct SelectionAllocator {
    /// Room and selection persistence.
    store: Arc<dyn RoomStore>,
    /// Lock serializing all selection mutations.
    lock: Arc<DistributedLock>,
    /// Key of the selection lock.
    lock_key: String,
    /// Lease time required before the first write.
    write_budget: Duration,
}

impl SelectionAllocator {
    /// Creates a new selection allocator.
    pub fn new(
        store: Arc<dyn RoomStore>,
        lock: Arc<DistributedLock>,
        config: &SelectionConfig,
    ) -> Self {
        Self {
            store,
            lock,
            lock_key: config.lock_key.clone(),
            write_budget: config.write_budget(),
        }
    }

    /// Key of the selection lock.
    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    /// Select `room_id` for `openid`, moving any existing selection.
    pub async fn set_selection(
        &self,
        openid: &str,
        room_id: &str,
    ) -> Result<Selection, SelectionError> {
        self.set_selection_with_cancel(openid, room_id, &CancellationToken::new())
            .await
    }

    /// Like [`Self::set_selection`], abandoning lock acquisition when `cancel` fires.
    pub async fn set_selection_with_cancel(
        &self,
        openid: &str,
        room_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Selection, SelectionError> {
        let guard = self.lock.acquire_with_cancel(&self.lock_key, cancel).await?;
        let result = self.set_selection_locked(&guard, openid, room_id).await;
        self.release(guard).await;
        result
    }

    /// Drop the selection of `openid`. Returns the released room id.
    pub async fn clear_selection(&self, openid: &str) -> Result<String, SelectionError> {
        self.clear_selection_with_cancel(openid, &CancellationToken::new())
            .await
    }

    /// Like [`Self::clear_selection`], abandoning lock acquisition when `cancel` fires.
    pub async fn clear_selection_with_cancel(
        &self,
        openid: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SelectionError> {
        let guard = self.lock.acquire_with_cancel(&self.lock_key, cancel).await?;
        let result = self.clear_selection_locked(&guard, openid).await;
        self.release(guard).await;
        result
    }

    /// Room currently selected by `openid`. Does not take the lock.
    pub async fn get_selection(&self, openid: &str) -> Result<String, SelectionError> {
        self.store
            .find_selection(openid)
            .await
            .map_err(store_error("look up selection"))?
            .map(|selection| selection.room_id)
            .ok_or_else(|| SelectionError::SelectionNotFound {
                openid: openid.to_string(),
            })
    }

    /// Whether `openid` holds a selection. Does not take the lock.
    pub async fn has_selection(&self, openid: &str) -> Result<bool, SelectionError> {
        let selection = self
            .store
            .find_selection(openid)
            .await
            .map_err(store_error("look up selection"))?;
        Ok(selection.is_some())
    }

    async fn set_selection_locked(
        &self,
        guard: &LockGuard,
        openid: &str,
        room_id: &str,
    ) -> Result<Selection, SelectionError> {
        let room = self
            .store
            .find_room(room_id, true)
            .await
            .map_err(store_error("look up room"))?
            .ok_or_else(|| SelectionError::RoomNotFound {
                room_id: room_id.to_string(),
            })?;

        let previous = self
            .store
            .find_selection(openid)
            .await
            .map_err(store_error("look up selection"))?;

        if previous.as_ref().is_some_and(|p| p.room_id == room_id) {
            debug!(openid = %openid, room_id = %room_id, "Room already selected");
            return Err(SelectionError::DuplicateSelection {
                room_id: room_id.to_string(),
            });
        }

        // Checked before touching the previous room so a refused switch changes nothing.
        if room.is_full() {
            debug!(
                room_id = %room_id,
                occupancy = room.occupancy,
                capacity = room.capacity,
                "Room full"
            );
            return Err(SelectionError::RoomFull {
                room_id: room_id.to_string(),
                capacity: room.capacity,
            });
        }

        guard.ensure_remaining(self.write_budget)?;

        if let Some(previous) = &previous {
            self.remove_selection(openid, &previous.room_id).await?;
        }

        match self.place_selection(openid, &room).await {
            Ok(selection) => {
                info!(
                    openid = %openid,
                    room_id = %room_id,
                    previous = previous.as_ref().map(|p| p.room_id.as_str()),
                    "Room selected"
                );
                Ok(selection)
            }
            Err(err) => {
                if let Some(previous) = &previous {
                    self.restore_previous(openid, previous).await;
                }
                Err(err)
            }
        }
    }

    async fn clear_selection_locked(
        &self,
        guard: &LockGuard,
        openid: &str,
    ) -> Result<String, SelectionError> {
        let selection = self
            .store
            .find_selection(openid)
            .await
            .map_err(store_error("look up selection"))?
            .ok_or_else(|| SelectionError::SelectionNotFound {
                openid: openid.to_string(),
            })?;

        guard.ensure_remaining(self.write_budget)?;
        self.remove_selection(openid, &selection.room_id).await?;
        info!(openid = %openid, room_id = %selection.room_id, "Selection cleared");
        Ok(selection.room_id)
    }

    /// Create the selection row and count it against the room.
    ///
    /// If the occupancy update fails after the row was created, the row is
    /// deleted again.
    async fn place_selection(
        &self,
        openid: &str,
        room: &Room,
    ) -> Result<Selection, SelectionError> {
        let selection = self
            .store
            .create_selection(openid, &room.room_id)
            .await
            .map_err(store_error("create selection"))?;

        if let Err(err) = self
            .store
            .update_room_occupancy(&room.room_id, room.occupancy + 1)
            .await
            .map_err(store_error("update room occupancy"))
        {
            if let Err(e) = self.store.delete_selection(openid, &room.room_id).await {
                error!(
                    openid = %openid,
                    room_id = %room.room_id,
                    error = %e,
                    "Failed to undo selection after occupancy update failure"
                );
            }
            return Err(err);
        }

        Ok(selection)
    }

    /// Delete the selection row and decrement the room, never below zero.
    ///
    /// The room is re-read regardless of availability so that a room taken
    /// offline still gets its place back.
    async fn remove_selection(&self, openid: &str, room_id: &str) -> Result<(), SelectionError> {
        let deleted = self
            .store
            .delete_selection(openid, room_id)
            .await
            .map_err(store_error("delete selection"))?;
        if !deleted {
            warn!(openid = %openid, room_id = %room_id, "Selection row already gone");
        }

        let Some(room) = self
            .store
            .find_room(room_id, false)
            .await
            .map_err(store_error("look up room"))?
        else {
            warn!(room_id = %room_id, "Released selection referenced a missing room");
            return Ok(());
        };

        if room.occupancy <= 0 {
            warn!(
                room_id = %room_id,
                occupancy = room.occupancy,
                "Occupancy drift: releasing from an empty room"
            );
            return Ok(());
        }

        self.store
            .update_room_occupancy(room_id, room.occupancy - 1)
            .await
            .map_err(store_error("update room occupancy"))?;
        debug!(openid = %openid, room_id = %room_id, "Selection removed");
        Ok(())
    }

    /// Best-effort undo of a switch whose second half failed.
    async fn restore_previous(&self, openid: &str, previous: &Selection) {
        warn!(
            openid = %openid,
            room_id = %previous.room_id,
            "Switch failed, restoring previous selection"
        );

        if let Err(e) = self
            .store
            .create_selection(openid, &previous.room_id)
            .await
        {
            error!(openid = %openid, room_id = %previous.room_id, error = %e, "Failed to restore previous selection");
            return;
        }

        let room = match self.store.find_room(&previous.room_id, false).await {
            Ok(Some(room)) => room,
            Ok(None) => return,
            Err(e) => {
                error!(room_id = %previous.room_id, error = %e, "Failed to re-read previous room");
                return;
            }
        };

        if room.occupancy < room.capacity {
            if let Err(e) = self
                .store
                .update_room_occupancy(&room.room_id, room.occupancy + 1)
                .await
            {
                error!(room_id = %room.room_id, error = %e, "Failed to restore previous room occupancy");
            }
        } else {
            warn!(room_id = %room.room_id, "Previous room refilled meanwhile; occupancy left for reconciliation");
        }
    }

    async fn release(&self, guard: LockGuard) {
        if let Err(e) = guard.release().await {
            warn!(key = %self.lock_key, error = %e, "Failed to release selection lock");
        }
    }
}

/// Wrap a store failure with the name of the operation that failed.
fn store_error(operation: &'static str) -> impl FnOnce(AppError) -> SelectionError {
    move |e| {
        error!(operation, error = %e, "Store operation failed");
        SelectionError::Internal(AppError::with_source(
            e.kind,
            format!("Failed to {operation}"),
            e,
        ))
    }
}
