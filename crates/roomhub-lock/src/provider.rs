//! Lease store manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use roomhub_core::config::lock::LockConfig;
use roomhub_core::error::AppError;
use roomhub_core::result::AppResult;
use roomhub_core::traits::lease::LeaseStore;

/// Wraps the lease store selected by `lock.provider`.
#[derive(Debug, Clone)]
pub struct LeaseStoreManager {
    /// The inner lease store.
    inner: Arc<dyn LeaseStore>,
}

impl LeaseStoreManager {
    /// Create a lease store from configuration.
    pub async fn new(config: &LockConfig) -> AppResult<Self> {
        let inner: Arc<dyn LeaseStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis lease store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisLeaseStore::new(client))
            }
            "memory" => {
                info!("Initializing in-memory lease store");
                Arc::new(crate::memory::MemoryLeaseStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown lock provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Wrap an existing lease store (for testing).
    pub fn from_store(store: Arc<dyn LeaseStore>) -> Self {
        Self { inner: store }
    }

    /// The inner lease store.
    pub fn store(&self) -> Arc<dyn LeaseStore> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl LeaseStore for LeaseStoreManager {
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.try_acquire(key, holder, ttl).await
    }

    async fn release(&self, key: &str, holder: &str) -> AppResult<bool> {
        self.inner.release(key, holder).await
    }

    async fn renew(&self, key: &str, holder: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.renew(key, holder, ttl).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
