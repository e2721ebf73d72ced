//! In-memory lease store using a Tokio mutex for single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use roomhub_core::error::AppError;
use roomhub_core::result::AppResult;
use roomhub_core::traits::lease::LeaseStore;

/// A held lease.
#[derive(Debug, Clone)]
struct Lease {
    /// Token of the current holder.
    holder: String,
    /// Instant after which the lease no longer exists.
    expires_at: Instant,
}

impl Lease {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory lease store.
///
/// Expiry uses `tokio::time::Instant`, so paused test time applies.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaseStore {
    /// Leases keyed by lock key.
    leases: Arc<Mutex<HashMap<String, Lease>>>,
    /// When set, every call fails as if the backend were down.
    unavailable: Arc<AtomicBool>,
}

impl MemoryLeaseStore {
    /// Create an empty lease store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend going down or coming back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Holder token of the live lease on `key`, if any.
    pub async fn current_holder(&self, key: &str) -> Option<String> {
        let leases = self.leases.lock().await;
        leases
            .get(key)
            .filter(|lease| lease.is_live(Instant::now()))
            .map(|lease| lease.holder.clone())
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::lock("In-memory lease store is unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> AppResult<bool> {
        self.check_available()?;
        let mut leases = self.leases.lock().await;
        let now = Instant::now();

        if leases.get(key).is_some_and(|lease| lease.is_live(now)) {
            return Ok(false);
        }

        leases.insert(
            key.to_string(),
            Lease {
                holder: holder.to_string(),
                expires_at: now + ttl,
            },
        );
        debug!(key = %key, "Lease created");
        Ok(true)
    }

    async fn release(&self, key: &str, holder: &str) -> AppResult<bool> {
        self.check_available()?;
        let mut leases = self.leases.lock().await;
        let now = Instant::now();

        let owned = leases
            .get(key)
            .is_some_and(|lease| lease.is_live(now) && lease.holder == holder);
        if owned {
            leases.remove(key);
        }
        Ok(owned)
    }

    async fn renew(&self, key: &str, holder: &str, ttl: Duration) -> AppResult<bool> {
        self.check_available()?;
        let mut leases = self.leases.lock().await;
        let now = Instant::now();

        match leases.get_mut(key) {
            Some(lease) if lease.is_live(now) && lease.holder == holder => {
                lease.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }
}
