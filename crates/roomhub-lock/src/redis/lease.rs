//! Redis lease store using `SET NX PX` and Lua scripts for owner checks.
//!
//! Suitable for multi-process deployments.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use roomhub_core::error::{AppError, ErrorKind};
use roomhub_core::result::AppResult;
use roomhub_core::traits::lease::LeaseStore;

use super::client::RedisClient;

/// Delete the key only if it still holds the caller's token.
///
/// KEYS[1] = lock key
/// ARGV[1] = holder token
///
/// Returns the number of keys deleted.
const RELEASE_SCRIPT: &str = r#"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('DEL', KEYS[1])
    end
    return 0
"#;

/// Reset the TTL only if the key still holds the caller's token.
///
/// KEYS[1] = lock key
/// ARGV[1] = holder token
/// ARGV[2] = TTL in milliseconds
///
/// Returns 1 if the TTL was reset, 0 otherwise.
const RENEW_SCRIPT: &str = r#"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('PEXPIRE', KEYS[1], ARGV[2])
    end
    return 0
"#;

/// Redis-backed lease store.
#[derive(Debug, Clone)]
pub struct RedisLeaseStore {
    /// Redis client.
    client: RedisClient,
}

impl RedisLeaseStore {
    /// Create a lease store over a connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError, naming the failed operation.
    fn map_err(op: &'static str, key: &str) -> impl FnOnce(redis::RedisError) -> AppError {
        let message = format!("Redis {op} failed for lock '{key}'");
        move |e| AppError::with_source(ErrorKind::Lock, message, e)
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl LeaseStore for RedisLeaseStore {
    async fn try_acquire(&self, key: &str, holder: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();

        // SET key token PX ttl NX
        let result: Option<String> = redis::cmd("SET")
            .arg(&full_key)
            .arg(holder)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err("SET NX", key))?;

        Ok(result.is_some())
    }

    async fn release(&self, key: &str, holder: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();

        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&full_key)
            .arg(holder)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err("release script", key))?;

        debug!(key = %key, deleted, "Lease release executed");
        Ok(deleted > 0)
    }

    async fn renew(&self, key: &str, holder: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();

        let renewed: i64 = redis::Script::new(RENEW_SCRIPT)
            .key(&full_key)
            .arg(holder)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err("renew script", key))?;

        Ok(renewed == 1)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err("PING", "-"))?;
        Ok(pong == "PONG")
    }
}
