//! Occupancy reconciliation against the selection rows.
//!
//! Repairs drift left behind by a process that lost its lease mid-operation
//! or crashed between a selection write and the matching occupancy update.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use roomhub_core::config::selection::SelectionConfig;
use roomhub_database::store::RoomStore;
use roomhub_lock::{DistributedLock, LockGuard};

use crate::error::SelectionError;

/// One rewritten occupancy counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancyCorrection {
    /// Room whose counter drifted.
    pub room_id: String,
    /// Counter value before the repair.
    pub recorded: i32,
    /// Number of selection rows referencing the room.
    pub actual: i64,
    /// Value written; capped at the room capacity.
    pub applied: i32,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Number of rooms inspected.
    pub rooms_checked: usize,
    /// Counters that were rewritten.
    pub corrections: Vec<OccupancyCorrection>,
}

impl ReconcileReport {
    /// Whether every counter already matched.
    pub fn is_consistent(&self) -> bool {
        self.corrections.is_empty()
    }
}

/// Rewrites room occupancy to match the selection rows.
#[derive(Debug, Clone)]
pub struct OccupancyReconciler {
    /// Room and selection persistence.
    store: Arc<dyn RoomStore>,
    /// Lock shared with the selection allocator.
    lock: Arc<DistributedLock>,
    /// Key of the selection lock.
    lock_key: String,
}

impl OccupancyReconciler {
    /// Creates a new occupancy reconciler.
    pub fn new(
        store: Arc<dyn RoomStore>,
        lock: Arc<DistributedLock>,
        config: &SelectionConfig,
    ) -> Self {
        Self {
            store,
            lock,
            lock_key: config.lock_key.clone(),
        }
    }

    /// Performs a full reconciliation pass under the selection lock.
    pub async fn reconcile(&self) -> Result<ReconcileReport, SelectionError> {
        self.reconcile_with_cancel(&CancellationToken::new()).await
    }

    /// Like [`Self::reconcile`], abandoning lock acquisition when `cancel` fires.
    pub async fn reconcile_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, SelectionError> {
        let guard = self.lock.acquire_with_cancel(&self.lock_key, cancel).await?;
        let result = self.reconcile_locked(&guard).await;
        if let Err(e) = guard.release().await {
            warn!(key = %self.lock_key, error = %e, "Failed to release selection lock");
        }

        let report = result?;
        if report.is_consistent() {
            info!(rooms = report.rooms_checked, "Occupancy consistent");
        } else {
            info!(
                rooms = report.rooms_checked,
                corrected = report.corrections.len(),
                "Occupancy reconciliation completed"
            );
        }
        Ok(report)
    }

    async fn reconcile_locked(&self, guard: &LockGuard) -> Result<ReconcileReport, SelectionError> {
        let rooms = self.store.list_rooms(false).await?;
        let mut report = ReconcileReport {
            rooms_checked: rooms.len(),
            corrections: Vec::new(),
        };

        for room in rooms {
            let actual = self.store.count_selections(&room.room_id).await?;
            if actual == i64::from(room.occupancy) {
                continue;
            }

            let applied = i32::try_from(actual)
                .unwrap_or(i32::MAX)
                .min(room.capacity);
            if i64::from(applied) != actual {
                error!(
                    room_id = %room.room_id,
                    selections = actual,
                    capacity = room.capacity,
                    "Room holds more selections than its capacity"
                );
            }
            if applied == room.occupancy {
                continue;
            }
            warn!(
                room_id = %room.room_id,
                recorded = room.occupancy,
                actual,
                "Occupancy drift detected, reconciling"
            );

            guard.ensure_held()?;
            self.store
                .update_room_occupancy(&room.room_id, applied)
                .await?;

            report.corrections.push(OccupancyCorrection {
                room_id: room.room_id,
                recorded: room.occupancy,
                actual,
                applied,
            });
        }

        Ok(report)
    }
}
