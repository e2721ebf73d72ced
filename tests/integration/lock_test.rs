//! Integration tests for mutual exclusion between lock instances.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;

use roomhub_lock::{DistributedLock, LockError, MemoryLeaseStore};

use crate::helpers;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lock_instances_exclude_each_other() {
    let leases = MemoryLeaseStore::new();
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks = (0..8).map(|_| {
        let lock = DistributedLock::new(Arc::new(leases.clone()), helpers::fast_retry());
        let inside = Arc::clone(&inside);
        let peak = Arc::clone(&peak);
        tokio::spawn(async move {
            let guard = lock.acquire("lock:shared").await?;
            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            inside.fetch_sub(1, Ordering::SeqCst);
            guard.release().await?;
            Ok::<_, LockError>(())
        })
    });

    for joined in join_all(tasks).await {
        joined.expect("task panicked").expect("lock acquired");
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(leases.current_holder("lock:shared").await.is_none());
}

#[tokio::test]
async fn test_independent_keys_do_not_contend() {
    let leases = MemoryLeaseStore::new();
    let lock = DistributedLock::new(Arc::new(leases.clone()), helpers::fast_retry());

    let selection = lock.acquire("lock:room_selection").await.unwrap();
    let user = lock.acquire("lock:user:u1").await.unwrap();

    assert_ne!(selection.holder(), user.holder());
    assert!(selection.release().await.unwrap());
    assert!(user.release().await.unwrap());
}
