//! Integration tests for room selection across concurrent processes.

use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use roomhub_core::config::SelectionConfig;
use roomhub_database::{MemoryRoomStore, RoomStore};
use roomhub_lock::LockOptions;
use roomhub_service::SelectionError;

use crate::helpers::{self, TestApp};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_selections_never_overbook() {
    let store = MemoryRoomStore::with_latency(Duration::from_millis(1));
    let app = TestApp::with_store(store, vec![helpers::room("a", 3, 9)], helpers::fast_retry()).await;
    let processes = [app.allocator.clone(), app.process()];

    let tasks = (0..20).map(|i| {
        let allocator = processes[i % 2].clone();
        tokio::spawn(async move { allocator.set_selection(&format!("user-{i}"), "a").await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let granted = results.iter().filter(|r| r.is_ok()).count();
    let full = results
        .iter()
        .filter(|r| matches!(r, Err(SelectionError::RoomFull { capacity: 3, .. })))
        .count();
    assert_eq!(granted, 3);
    assert_eq!(full, 17);
    assert_eq!(app.occupancy("a").await, 3);
    assert_eq!(app.selections_in("a").await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_requests_of_one_user_leave_one_selection() {
    let store = MemoryRoomStore::with_latency(Duration::from_millis(1));
    let rooms = ["a", "b", "c", "d", "e"];
    let app = TestApp::with_store(
        store,
        rooms.iter().map(|id| helpers::room(id, 5, 10)).collect(),
        helpers::fast_retry(),
    )
    .await;
    let processes = [app.allocator.clone(), app.process()];

    let tasks = rooms.iter().enumerate().map(|(i, id)| {
        let allocator = processes[i % 2].clone();
        let room_id = id.to_string();
        tokio::spawn(async move { allocator.set_selection("same-user", &room_id).await })
    });
    for joined in join_all(tasks).await {
        joined.expect("task panicked").expect("switch succeeds");
    }

    let held = app.allocator.get_selection("same-user").await.unwrap();
    let mut total = 0;
    for id in rooms {
        let occupancy = app.occupancy(id).await;
        assert_eq!(occupancy, if id == held { 1 } else { 0 });
        total += occupancy;
    }
    assert_eq!(total, 1);
    assert_eq!(app.store.selections().await.len(), 1);
}

#[tokio::test]
async fn test_capacity_two_scenario() {
    let app = TestApp::new(vec![helpers::room("r1", 2, 9)]).await;

    app.allocator.set_selection("u1", "r1").await.unwrap();
    app.allocator.set_selection("u2", "r1").await.unwrap();
    let err = app.allocator.set_selection("u3", "r1").await.unwrap_err();
    assert!(matches!(err, SelectionError::RoomFull { .. }));
    assert_eq!(app.occupancy("r1").await, 2);

    assert_eq!(app.allocator.clear_selection("u1").await.unwrap(), "r1");
    app.allocator.set_selection("u3", "r1").await.unwrap();
    assert_eq!(app.occupancy("r1").await, 2);
    assert_eq!(app.allocator.get_selection("u3").await.unwrap(), "r1");
}

#[tokio::test]
async fn test_switch_moves_user_between_rooms() {
    let app = TestApp::new(vec![helpers::room("a", 1, 9), helpers::room("b", 1, 11)]).await;

    app.allocator.set_selection("u1", "a").await.unwrap();
    app.process().set_selection("u1", "b").await.unwrap();

    assert_eq!(app.occupancy("a").await, 0);
    assert_eq!(app.occupancy("b").await, 1);
    assert_eq!(app.allocator.get_selection("u1").await.unwrap(), "b");

    // The freed place in A is immediately usable by someone else.
    app.allocator.set_selection("u2", "a").await.unwrap();
    assert_eq!(app.occupancy("a").await, 1);
}

#[tokio::test]
async fn test_refused_switch_changes_nothing() {
    let app = TestApp::new(vec![helpers::room("a", 2, 9), helpers::room("b", 1, 11)]).await;
    app.allocator.set_selection("u1", "a").await.unwrap();
    app.allocator.set_selection("u2", "b").await.unwrap();

    let err = app.allocator.set_selection("u1", "b").await.unwrap_err();
    assert!(matches!(err, SelectionError::RoomFull { .. }));
    assert_eq!(app.allocator.get_selection("u1").await.unwrap(), "a");
    assert_eq!(app.occupancy("a").await, 1);
    assert_eq!(app.occupancy("b").await, 1);
}

#[tokio::test]
async fn test_duplicate_selection_is_rejected_without_effect() {
    let app = TestApp::new(vec![helpers::room("a", 3, 9)]).await;
    app.allocator.set_selection("u1", "a").await.unwrap();

    for _ in 0..3 {
        let err = app.allocator.set_selection("u1", "a").await.unwrap_err();
        assert!(matches!(err, SelectionError::DuplicateSelection { .. }));
    }
    assert_eq!(app.occupancy("a").await, 1);
    assert_eq!(app.selections_in("a").await, 1);
}

#[tokio::test]
async fn test_clear_without_selection_is_not_found() {
    let app = TestApp::new(vec![helpers::room("a", 3, 9)]).await;
    app.allocator.set_selection("u1", "a").await.unwrap();

    let err = app.allocator.clear_selection("nobody").await.unwrap_err();
    assert!(matches!(err, SelectionError::SelectionNotFound { .. }));
    assert_eq!(app.occupancy("a").await, 1);
    assert!(!app.allocator.has_selection("nobody").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_busy_lock_times_out_without_touching_state() {
    let app = TestApp::new(vec![helpers::room("a", 3, 9)]).await;
    let holder = app.lock().acquire(app.allocator.lock_key()).await.unwrap();

    let started = Instant::now();
    let err = app.process().set_selection("u1", "a").await.unwrap_err();

    assert!(matches!(
        err,
        SelectionError::LockTimeout { attempts: 50, .. }
    ));
    assert!(started.elapsed() < app.options.ttl);
    assert_eq!(app.occupancy("a").await, 0);
    assert!(!app.allocator.has_selection("u1").await.unwrap());
    holder.release().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting_for_lock() {
    let app = TestApp::new(vec![helpers::room("a", 3, 9)]).await;
    let _holder = app.lock().acquire(app.allocator.lock_key()).await.unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = app
        .allocator
        .set_selection_with_cancel("u1", "a", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SelectionError::Cancelled));
    assert_eq!(started.elapsed(), Duration::from_secs(1));

    let err = app
        .allocator
        .clear_selection_with_cancel("u1", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SelectionError::Cancelled));
}

fn slow_lease() -> LockOptions {
    LockOptions {
        ttl: Duration::from_secs(1),
        safety_margin: Duration::from_millis(200),
        ..LockOptions::default()
    }
}

/// Writes must fit in 300ms of lease after the reads.
fn slow_selection() -> SelectionConfig {
    SelectionConfig {
        write_budget_ms: 300,
        ..SelectionConfig::default()
    }
}

/// `u1` already holds room `a`; room `b` is free. Every store call takes `latency`.
async fn slow_switch_app(latency: Duration) -> TestApp {
    let mut a = helpers::room("a", 2, 9);
    a.occupancy = 1;
    let store = MemoryRoomStore::with_latency(latency);
    let app = TestApp::with_config(
        store,
        vec![a, helpers::room("b", 2, 11)],
        slow_lease(),
        slow_selection(),
    )
    .await;
    app.store.create_selection("u1", "a").await.unwrap();
    app
}

#[tokio::test(start_paused = true)]
async fn test_expired_lease_stops_writes() {
    let store = MemoryRoomStore::with_latency(Duration::from_millis(600));
    let app = TestApp::with_config(
        store,
        vec![helpers::room("a", 3, 9)],
        slow_lease(),
        slow_selection(),
    )
    .await;

    let err = app.allocator.set_selection("u1", "a").await.unwrap_err();
    assert!(matches!(err, SelectionError::LeaseLost));
    assert!(app.store.selections().await.is_empty());
    assert_eq!(app.occupancy("a").await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_renewal_keeps_slow_operation_valid() {
    let store = MemoryRoomStore::with_latency(Duration::from_millis(600));
    let options = LockOptions {
        renewal_interval: Some(Duration::from_millis(300)),
        ..slow_lease()
    };
    let app = TestApp::with_config(store, vec![helpers::room("a", 3, 9)], options, slow_selection()).await;

    app.allocator.set_selection("u1", "a").await.unwrap();
    assert_eq!(app.occupancy("a").await, 1);
    assert_eq!(app.selections_in("a").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_switch_finishes_once_writes_begin() {
    // The lease lapses during the writes for each of these latencies.
    for latency in [150, 180, 200] {
        let app = slow_switch_app(Duration::from_millis(latency)).await;

        let selection = app.allocator.set_selection("u1", "b").await.unwrap();
        assert_eq!(selection.room_id, "b", "latency {latency}ms");
        assert_eq!(app.allocator.get_selection("u1").await.unwrap(), "b");
        assert_eq!(app.occupancy("a").await, 0, "latency {latency}ms");
        assert_eq!(app.occupancy("b").await, 1, "latency {latency}ms");
        assert_eq!(app.selections_in("a").await, 0);
        assert_eq!(app.selections_in("b").await, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_switch_without_write_budget_changes_nothing() {
    let app = slow_switch_app(Duration::from_millis(300)).await;

    let err = app.allocator.set_selection("u1", "b").await.unwrap_err();
    assert!(matches!(err, SelectionError::LeaseLost));
    assert_eq!(app.allocator.get_selection("u1").await.unwrap(), "a");
    assert_eq!(app.occupancy("a").await, 1);
    assert_eq!(app.occupancy("b").await, 0);
    assert_eq!(app.selections_in("a").await, 1);
    assert_eq!(app.selections_in("b").await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_clear_finishes_once_writes_begin() {
    let app = slow_switch_app(Duration::from_millis(400)).await;

    assert_eq!(app.allocator.clear_selection("u1").await.unwrap(), "a");
    assert!(!app.allocator.has_selection("u1").await.unwrap());
    assert_eq!(app.occupancy("a").await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_clear_without_write_budget_changes_nothing() {
    let app = slow_switch_app(Duration::from_millis(500)).await;

    let err = app.allocator.clear_selection("u1").await.unwrap_err();
    assert!(matches!(err, SelectionError::LeaseLost));
    assert_eq!(app.allocator.get_selection("u1").await.unwrap(), "a");
    assert_eq!(app.occupancy("a").await, 1);
    assert_eq!(app.selections_in("a").await, 1);
}

#[tokio::test]
async fn test_reconciler_repairs_counter_after_interrupted_write() {
    let app = TestApp::new(vec![helpers::room("a", 3, 9), helpers::room("b", 3, 10)]).await;
    app.allocator.set_selection("u1", "a").await.unwrap();

    // A process that died between the selection insert and the counter update.
    app.store.create_selection("u2", "b").await.unwrap();
    assert_eq!(app.occupancy("b").await, 0);

    let report = app.reconciler().reconcile().await.unwrap();
    assert_eq!(report.rooms_checked, 2);
    assert_eq!(report.corrections.len(), 1);
    assert_eq!(report.corrections[0].room_id, "b");
    assert_eq!(app.occupancy("a").await, 1);
    assert_eq!(app.occupancy("b").await, 1);
}
