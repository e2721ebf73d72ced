//! Distributed lock configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Lease lock configuration.
///
/// The defaults give a 10 second lease and a retry window of
/// 50 attempts spaced 200 ms apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Lease store backend: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis backend configuration.
    #[serde(default)]
    pub redis: RedisLockConfig,
    /// Lease duration in milliseconds.
    #[serde(default = "default_ttl")]
    pub ttl_ms: u64,
    /// Number of acquisition attempts before giving up.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Pause between acquisition attempts in milliseconds.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,
    /// Portion of the lease at its tail that a holder must not write in.
    #[serde(default = "default_safety_margin")]
    pub safety_margin_ms: u64,
    /// Lease renewal (heartbeat) configuration.
    #[serde(default)]
    pub renewal: RenewalConfig,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis: RedisLockConfig::default(),
            ttl_ms: default_ttl(),
            retry_attempts: default_retry_attempts(),
            retry_interval_ms: default_retry_interval(),
            safety_margin_ms: default_safety_margin(),
            renewal: RenewalConfig::default(),
        }
    }
}

impl LockConfig {
    /// Lease duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Pause between acquisition attempts.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Safety margin subtracted from the lease deadline.
    pub fn safety_margin(&self) -> Duration {
        Duration::from_millis(self.safety_margin_ms)
    }

    /// Renewal interval, if renewal is enabled.
    pub fn renewal_interval(&self) -> Option<Duration> {
        self.renewal
            .enabled
            .then(|| Duration::from_millis(self.renewal.interval_ms))
    }

    /// Reject settings that would make the lock unusable or unsafe.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.ttl_ms == 0 {
            return Err(AppError::configuration("lock.ttl_ms must be positive"));
        }
        if self.retry_attempts == 0 {
            return Err(AppError::configuration(
                "lock.retry_attempts must be at least 1",
            ));
        }
        if self.safety_margin_ms >= self.ttl_ms {
            return Err(AppError::configuration(
                "lock.safety_margin_ms must be smaller than lock.ttl_ms",
            ));
        }
        if self.renewal.enabled
            && (self.renewal.interval_ms == 0 || self.renewal.interval_ms >= self.ttl_ms)
        {
            return Err(AppError::configuration(
                "lock.renewal.interval_ms must be positive and smaller than lock.ttl_ms",
            ));
        }
        match self.provider.as_str() {
            "redis" | "memory" => Ok(()),
            other => Err(AppError::configuration(format!(
                "Unknown lock provider: '{other}'. Supported: memory, redis"
            ))),
        }
    }
}

/// Redis lease store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisLockConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prefix applied to every lock key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisLockConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Lease renewal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalConfig {
    /// Whether held leases are extended in the background.
    #[serde(default)]
    pub enabled: bool,
    /// Interval between renewals in milliseconds.
    #[serde(default = "default_renewal_interval")]
    pub interval_ms: u64,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_renewal_interval(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_ttl() -> u64 {
    10_000
}

fn default_retry_attempts() -> u32 {
    50
}

fn default_retry_interval() -> u64 {
    200
}

fn default_safety_margin() -> u64 {
    500
}

fn default_renewal_interval() -> u64 {
    3_000
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "roomhub:".to_string()
}
