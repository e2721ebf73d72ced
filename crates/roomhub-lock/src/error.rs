//! Lock acquisition and lease errors.

use thiserror::Error;

use roomhub_core::error::{AppError, ErrorKind};

/// Failure to obtain or keep a lease.
#[derive(Debug, Error)]
pub enum LockError {
    /// Every acquisition attempt found the key held by someone else.
    #[error("Lock '{key}' not acquired after {attempts} attempts")]
    Timeout {
        /// Lock key.
        key: String,
        /// Number of attempts made.
        attempts: u32,
    },
    /// The caller cancelled while waiting for the lock.
    #[error("Acquisition of lock '{key}' was cancelled")]
    Cancelled {
        /// Lock key.
        key: String,
    },
    /// The lease expired or was taken over while the guard was alive.
    #[error("Lease on lock '{key}' is no longer held")]
    LeaseLost {
        /// Lock key.
        key: String,
    },
    /// The lease store failed.
    #[error(transparent)]
    Backend(#[from] AppError),
}

impl From<LockError> for AppError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Backend(inner) => inner,
            LockError::Timeout { .. } | LockError::Cancelled { .. } => {
                AppError::new(ErrorKind::ServiceUnavailable, err.to_string())
            }
            LockError::LeaseLost { .. } => AppError::new(ErrorKind::Lock, err.to_string()),
        }
    }
}
