//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use roomhub_core::config::SelectionConfig;
use roomhub_database::{MemoryRoomStore, RoomStore};
use roomhub_entity::room::Room;
use roomhub_lock::{DistributedLock, LockOptions, MemoryLeaseStore};
use roomhub_service::{OccupancyReconciler, SelectionAllocator};

/// Build a room scheduled on 2024-09-14 at `hour`.
pub fn room(room_id: &str, capacity: i32, hour: u32) -> Room {
    Room {
        room_id: room_id.to_string(),
        name: format!("Interview {room_id}"),
        scheduled_time: NaiveDate::from_ymd_opt(2024, 9, 14)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid test timestamp"),
        capacity,
        occupancy: 0,
        location: "Building 3".to_string(),
        available: true,
    }
}

/// Lock options with a short retry interval for real-time concurrency tests.
pub fn fast_retry() -> LockOptions {
    LockOptions {
        retry_attempts: 1000,
        retry_interval: Duration::from_millis(5),
        ..LockOptions::default()
    }
}

/// Shared stores plus an allocator; further "processes" attach to the same stores.
pub struct TestApp {
    /// Durable store shared by every process.
    pub store: MemoryRoomStore,
    /// Lease store shared by every process.
    pub leases: MemoryLeaseStore,
    /// Lock options used by every process.
    pub options: LockOptions,
    /// Selection settings used by every process.
    pub selection: SelectionConfig,
    /// Allocator of the first process.
    pub allocator: SelectionAllocator,
}

impl TestApp {
    /// Create stores seeded with `rooms` and default lock options.
    pub async fn new(rooms: Vec<Room>) -> Self {
        Self::with_store(MemoryRoomStore::new(), rooms, LockOptions::default()).await
    }

    /// Create stores seeded with `rooms` using the given store and lock options.
    pub async fn with_store(store: MemoryRoomStore, rooms: Vec<Room>, options: LockOptions) -> Self {
        Self::with_config(store, rooms, options, SelectionConfig::default()).await
    }

    /// Like [`Self::with_store`], with explicit selection settings.
    pub async fn with_config(
        store: MemoryRoomStore,
        rooms: Vec<Room>,
        options: LockOptions,
        selection: SelectionConfig,
    ) -> Self {
        for room in rooms {
            store.insert_room(room).await;
        }
        let leases = MemoryLeaseStore::new();
        let allocator = build_allocator(&store, &leases, &options, &selection);
        Self {
            store,
            leases,
            options,
            selection,
            allocator,
        }
    }

    /// An allocator with its own lock instance over the shared stores.
    pub fn process(&self) -> SelectionAllocator {
        build_allocator(&self.store, &self.leases, &self.options, &self.selection)
    }

    /// A reconciler over the shared stores.
    pub fn reconciler(&self) -> OccupancyReconciler {
        OccupancyReconciler::new(
            Arc::new(self.store.clone()),
            Arc::new(self.lock()),
            &self.selection,
        )
    }

    /// A lock over the shared lease store.
    pub fn lock(&self) -> DistributedLock {
        DistributedLock::new(Arc::new(self.leases.clone()), self.options.clone())
    }

    /// Current occupancy counter of a room.
    pub async fn occupancy(&self, room_id: &str) -> i32 {
        self.store
            .find_room(room_id, false)
            .await
            .expect("room lookup")
            .expect("room exists")
            .occupancy
    }

    /// Number of selection rows referencing a room.
    pub async fn selections_in(&self, room_id: &str) -> i64 {
        self.store
            .count_selections(room_id)
            .await
            .expect("selection count")
    }
}

fn build_allocator(
    store: &MemoryRoomStore,
    leases: &MemoryLeaseStore,
    options: &LockOptions,
    selection: &SelectionConfig,
) -> SelectionAllocator {
    let lock = DistributedLock::new(Arc::new(leases.clone()), options.clone());
    SelectionAllocator::new(Arc::new(store.clone()), Arc::new(lock), selection)
}
