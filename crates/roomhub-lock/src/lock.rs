//! Lease-based distributed lock.
//!
//! A lock is an entry in a [`LeaseStore`] holding a random per-acquisition
//! token. Acquisition retries at a fixed interval up to a bounded number of
//! attempts. The returned [`LockGuard`] tracks the lease deadline locally so
//! a critical section can check that it still owns the lease before writing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use roomhub_core::config::lock::LockConfig;
use roomhub_core::traits::lease::LeaseStore;

use crate::error::LockError;

/// Acquisition and lease parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// Lease duration.
    pub ttl: Duration,
    /// Number of acquisition attempts.
    pub retry_attempts: u32,
    /// Pause between attempts.
    pub retry_interval: Duration,
    /// Tail of the lease in which the holder must not start a write.
    pub safety_margin: Duration,
    /// Heartbeat interval; `None` disables renewal.
    pub renewal_interval: Option<Duration>,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            retry_attempts: 50,
            retry_interval: Duration::from_millis(200),
            safety_margin: Duration::from_millis(500),
            renewal_interval: None,
        }
    }
}

impl From<&LockConfig> for LockOptions {
    fn from(config: &LockConfig) -> Self {
        Self {
            ttl: config.ttl(),
            retry_attempts: config.retry_attempts,
            retry_interval: config.retry_interval(),
            safety_margin: config.safety_margin(),
            renewal_interval: config.renewal_interval(),
        }
    }
}

/// Lock over a shared lease store.
#[derive(Debug, Clone)]
pub struct DistributedLock {
    /// Backing lease store.
    store: Arc<dyn LeaseStore>,
    /// Acquisition and lease parameters.
    options: LockOptions,
}

impl DistributedLock {
    /// Create a lock over `store`.
    pub fn new(store: Arc<dyn LeaseStore>, options: LockOptions) -> Self {
        Self { store, options }
    }

    /// Create a lock using the parameters of the `lock` config section.
    pub fn from_config(store: Arc<dyn LeaseStore>, config: &LockConfig) -> Self {
        Self::new(store, LockOptions::from(config))
    }

    /// Acquisition and lease parameters.
    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// The backing lease store.
    pub fn store(&self) -> &Arc<dyn LeaseStore> {
        &self.store
    }

    /// Acquire `key`, retrying while it is held elsewhere.
    pub async fn acquire(&self, key: &str) -> Result<LockGuard, LockError> {
        self.acquire_with_cancel(key, &CancellationToken::new())
            .await
    }

    /// Acquire `key`, giving up as soon as `cancel` fires.
    ///
    /// No sleep follows the final attempt, so with the defaults a contended
    /// acquisition fails after 49 retry intervals.
    pub async fn acquire_with_cancel(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<LockGuard, LockError> {
        let holder = Uuid::new_v4().to_string();
        let attempts = self.options.retry_attempts;

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                debug!(key = %key, attempt, "Lock acquisition cancelled");
                return Err(LockError::Cancelled {
                    key: key.to_string(),
                });
            }

            // The lease can only have started after this instant.
            let started = Instant::now();
            let acquired = self
                .store
                .try_acquire(key, &holder, self.options.ttl)
                .await
                .map_err(|e| {
                    error!(key = %key, error = %e, "Lease store failed during acquisition");
                    LockError::Backend(e)
                })?;

            if acquired {
                debug!(key = %key, attempt, "Lock acquired");
                return Ok(LockGuard::new(
                    key.to_string(),
                    holder,
                    Arc::clone(&self.store),
                    &self.options,
                    started + self.options.ttl,
                ));
            }

            if attempt == attempts {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(key = %key, attempt, "Lock acquisition cancelled while waiting");
                    return Err(LockError::Cancelled { key: key.to_string() });
                }
                _ = tokio::time::sleep(self.options.retry_interval) => {}
            }
        }

        warn!(key = %key, attempts, "Lock acquisition timed out");
        Err(LockError::Timeout {
            key: key.to_string(),
            attempts,
        })
    }
}

/// Lease state shared between a guard and its heartbeat task.
#[derive(Debug)]
struct LeaseState {
    /// Latest instant at which the lease is known to be valid.
    deadline: Mutex<Instant>,
    /// Set once a renewal finds the key gone or owned by someone else.
    lost: AtomicBool,
}

impl LeaseState {
    fn deadline(&self) -> Instant {
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn extend(&self, deadline: Instant) {
        let mut current = self.deadline.lock().unwrap_or_else(PoisonError::into_inner);
        if deadline > *current {
            *current = deadline;
        }
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }
}

/// Proof of a held lease.
///
/// Call [`LockGuard::release`] when done. A guard dropped without release
/// spawns the same owner-checked release on the current runtime.
#[derive(Debug)]
pub struct LockGuard {
    /// Lock key.
    key: String,
    /// Token written at acquisition.
    holder: String,
    /// Lease store the lease lives in.
    store: Arc<dyn LeaseStore>,
    /// Deadline and loss flag.
    lease: Arc<LeaseState>,
    /// Tail of the lease treated as already expired.
    safety_margin: Duration,
    /// Renewal task, if enabled.
    heartbeat: Option<JoinHandle<()>>,
    /// Whether `release` already ran.
    released: bool,
}

impl LockGuard {
    fn new(
        key: String,
        holder: String,
        store: Arc<dyn LeaseStore>,
        options: &LockOptions,
        deadline: Instant,
    ) -> Self {
        let lease = Arc::new(LeaseState {
            deadline: Mutex::new(deadline),
            lost: AtomicBool::new(false),
        });

        let heartbeat = options.renewal_interval.map(|interval| {
            spawn_heartbeat(
                Arc::clone(&store),
                key.clone(),
                holder.clone(),
                options.ttl,
                interval,
                Arc::clone(&lease),
            )
        });

        Self {
            key,
            holder,
            store,
            lease,
            safety_margin: options.safety_margin,
            heartbeat,
            released: false,
        }
    }

    /// Lock key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Holder token of this acquisition.
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Time left before the lease enters its safety margin.
    pub fn remaining(&self) -> Duration {
        if self.lease.is_lost() {
            return Duration::ZERO;
        }
        self.lease
            .deadline()
            .saturating_duration_since(Instant::now())
            .saturating_sub(self.safety_margin)
    }

    /// Fail unless the lease is still safely held.
    ///
    /// Call before every write that relies on mutual exclusion.
    pub fn ensure_held(&self) -> Result<(), LockError> {
        self.ensure_remaining(Duration::ZERO)
    }

    /// Fail unless the lease stays safely held for at least `budget`.
    ///
    /// Call once before a sequence of writes that must not be cut short.
    pub fn ensure_remaining(&self, budget: Duration) -> Result<(), LockError> {
        let horizon = Instant::now() + self.safety_margin + budget;
        if self.lease.is_lost() || horizon >= self.lease.deadline() {
            warn!(
                key = %self.key,
                budget_ms = budget.as_millis() as u64,
                remaining_ms = self.remaining().as_millis() as u64,
                "Lease no longer safely held"
            );
            return Err(LockError::LeaseLost {
                key: self.key.clone(),
            });
        }
        Ok(())
    }

    /// Release the lease if this guard still owns it.
    ///
    /// Returns `false` when the lease had already expired or moved to another
    /// holder, in which case nothing is deleted.
    pub async fn release(mut self) -> Result<bool, LockError> {
        self.released = true;
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }

        let deleted = self.store.release(&self.key, &self.holder).await?;
        if deleted {
            debug!(key = %self.key, "Lock released");
        } else {
            warn!(key = %self.key, "Lease expired before release");
        }
        Ok(deleted)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        if self.released {
            return;
        }

        let key = std::mem::take(&mut self.key);
        let holder = std::mem::take(&mut self.holder);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                handle.spawn(async move {
                    match store.release(&key, &holder).await {
                        Ok(true) => debug!(key = %key, "Lock released on drop"),
                        Ok(false) => {}
                        Err(e) => warn!(key = %key, error = %e, "Failed to release dropped lock"),
                    }
                });
            }
            Err(_) => {
                warn!(key = %key, "Lock guard dropped outside a runtime; lease left to expire");
            }
        }
    }
}

/// Extend the lease every `interval` until it is lost or the task is aborted.
fn spawn_heartbeat(
    store: Arc<dyn LeaseStore>,
    key: String,
    holder: String,
    ttl: Duration,
    interval: Duration,
    lease: Arc<LeaseState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        loop {
            ticker.tick().await;
            let started = Instant::now();
            match store.renew(&key, &holder, ttl).await {
                Ok(true) => {
                    lease.extend(started + ttl);
                    debug!(key = %key, "Lease renewed");
                }
                Ok(false) => {
                    lease.mark_lost();
                    info!(key = %key, "Lease taken over or expired; renewal stopped");
                    break;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Lease renewal failed, will retry");
                }
            }
        }
    })
}
