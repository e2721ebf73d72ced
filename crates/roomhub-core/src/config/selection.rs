//! Room selection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings for the selection allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Lock key serializing every selection mutation.
    ///
    /// All processes sharing a database must use the same key.
    #[serde(default = "default_lock_key")]
    pub lock_key: String,
    /// Lease time a mutation must have left before its first write, in ms.
    ///
    /// Once the first write lands the mutation runs to completion, so this
    /// must cover the whole write sequence.
    #[serde(default = "default_write_budget_ms")]
    pub write_budget_ms: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            lock_key: default_lock_key(),
            write_budget_ms: default_write_budget_ms(),
        }
    }
}

impl SelectionConfig {
    /// Lease budget required before the first write.
    pub fn write_budget(&self) -> Duration {
        Duration::from_millis(self.write_budget_ms)
    }

    /// Reject an empty lock key.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.lock_key.trim().is_empty() {
            return Err(AppError::configuration(
                "selection.lock_key must not be empty",
            ));
        }
        Ok(())
    }
}

fn default_lock_key() -> String {
    "lock:room_selection".to_string()
}

fn default_write_budget_ms() -> u64 {
    2000
}
