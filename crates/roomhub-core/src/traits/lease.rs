//! Lease store trait backing the distributed lock.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// A shared keyed store that can hold expiring, owner-tagged entries.
///
/// Every mutation is conditional on the holder token so that a process whose
/// lease already expired cannot disturb the lease of its successor.
/// Two implementations are provided:
/// - Redis-based (`SET NX PX` plus Lua scripts), shared across processes
/// - In-memory (Tokio mutex), for single-process deployments and tests
#[async_trait]
pub trait LeaseStore: Send + Sync + std::fmt::Debug + 'static {
    /// Create `key` holding `holder` with the given TTL if it is absent.
    ///
    /// Returns `true` if the lease was created, `false` if the key is held.
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> AppResult<bool>;

    /// Delete `key` if it is still held by `holder`.
    ///
    /// Returns `true` if the entry was deleted.
    async fn release(&self, key: &str, holder: &str) -> AppResult<bool>;

    /// Reset the TTL of `key` if it is still held by `holder`.
    ///
    /// Returns `false` if the lease expired or belongs to someone else.
    async fn renew(&self, key: &str, holder: &str, ttl: Duration) -> AppResult<bool>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
