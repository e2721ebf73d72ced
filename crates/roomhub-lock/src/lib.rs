//! # roomhub-lock
//!
//! Mutual exclusion across processes built on an expiring, owner-tagged
//! entry in a shared keyed store.
//!
//! ## Modules
//!
//! - `lock` — `DistributedLock` acquisition with bounded retry and the `LockGuard` lease handle
//! - `memory` — single-process lease store
//! - `redis` — Redis lease store (`SET NX PX` plus Lua compare scripts)
//! - `provider` — lease store selection from configuration

pub mod error;
pub mod lock;
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use error::LockError;
pub use lock::{DistributedLock, LockGuard, LockOptions};
pub use memory::MemoryLeaseStore;
pub use provider::LeaseStoreManager;
