//! Tests against real PostgreSQL and Redis.
//!
//! Ignored by default. Run with `--ignored` after pointing
//! `ROOMHUB_TEST_DATABASE_URL` and `ROOMHUB_TEST_REDIS_URL` at disposable
//! instances.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use sqlx::PgPool;

use roomhub_core::config::{RedisLockConfig, SelectionConfig};
use roomhub_core::traits::lease::LeaseStore;
use roomhub_database::{DatabasePool, PgRoomStore, RoomStore};
use roomhub_lock::redis::{RedisClient, RedisLeaseStore};
use roomhub_lock::{DistributedLock, LockOptions};
use roomhub_service::{RoomCatalog, SelectionAllocator, SelectionError};

fn env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set for backend tests"))
}

async fn redis_leases() -> RedisLeaseStore {
    let config = RedisLockConfig {
        url: env("ROOMHUB_TEST_REDIS_URL"),
        key_prefix: "roomhub-test:".to_string(),
    };
    RedisLeaseStore::new(RedisClient::connect(&config).await.expect("redis connect"))
}

async fn seeded_pool() -> PgPool {
    let pool = PgPool::connect(&env("ROOMHUB_TEST_DATABASE_URL"))
        .await
        .expect("postgres connect");
    let version = roomhub_database::migration::run_migrations(&DatabasePool::from_pool(pool.clone()))
        .await
        .expect("migrations");
    assert_eq!(Some(version), roomhub_database::migration::latest_version());

    sqlx::query("DELETE FROM selections WHERE room_id LIKE 'it-%'")
        .execute(&pool)
        .await
        .expect("clean selections");
    sqlx::query("DELETE FROM rooms WHERE room_id LIKE 'it-%'")
        .execute(&pool)
        .await
        .expect("clean rooms");

    let day = NaiveDate::from_ymd_opt(2031, 3, 4).expect("valid date");
    for (room_id, capacity, hour) in [("it-a", 1, 9), ("it-b", 2, 14)] {
        sqlx::query(
            "INSERT INTO rooms (room_id, name, scheduled_time, capacity, location) \
             VALUES ($1, $2, $3, $4, 'Test lab')",
        )
        .bind(room_id)
        .bind(room_id.to_uppercase())
        .bind(day.and_hms_opt(hour, 0, 0).expect("valid time"))
        .bind(capacity)
        .execute(&pool)
        .await
        .expect("seed room");
    }
    pool
}

#[tokio::test]
#[ignore = "requires ROOMHUB_TEST_REDIS_URL"]
async fn test_redis_release_is_owner_only() {
    let leases = redis_leases().await;
    let ttl = Duration::from_secs(5);
    let _ = leases.release("it:lock", "a").await;

    assert!(leases.health_check().await.unwrap());
    assert!(leases.try_acquire("it:lock", "a", ttl).await.unwrap());
    assert!(!leases.try_acquire("it:lock", "b", ttl).await.unwrap());
    assert!(!leases.release("it:lock", "b").await.unwrap());
    assert!(leases.renew("it:lock", "a", ttl).await.unwrap());
    assert!(leases.release("it:lock", "a").await.unwrap());
    assert!(!leases.renew("it:lock", "a", ttl).await.unwrap());
}

#[tokio::test]
#[ignore = "requires ROOMHUB_TEST_DATABASE_URL and ROOMHUB_TEST_REDIS_URL"]
async fn test_selection_flow_on_postgres_and_redis() {
    let pool = seeded_pool().await;
    let store = Arc::new(PgRoomStore::new(DatabasePool::from_pool(pool.clone())));
    let lock = DistributedLock::new(Arc::new(redis_leases().await), LockOptions::default());
    let allocator = SelectionAllocator::new(store.clone(), Arc::new(lock), &SelectionConfig::default());

    allocator.set_selection("it-user-1", "it-a").await.unwrap();
    let err = allocator.set_selection("it-user-2", "it-a").await.unwrap_err();
    assert!(matches!(err, SelectionError::RoomFull { .. }));

    allocator.set_selection("it-user-1", "it-b").await.unwrap();
    assert_eq!(store.find_room("it-a", false).await.unwrap().unwrap().occupancy, 0);
    assert_eq!(store.find_room("it-b", false).await.unwrap().unwrap().occupancy, 1);

    let catalog = RoomCatalog::new(store.clone());
    let rooms = catalog.list_rooms_on("2031-03-04").await.unwrap();
    assert_eq!(rooms.len(), 2);

    assert_eq!(allocator.clear_selection("it-user-1").await.unwrap(), "it-b");
    assert_eq!(store.count_selections("it-b").await.unwrap(), 0);
}
