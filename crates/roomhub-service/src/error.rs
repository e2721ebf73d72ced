//! Selection outcome errors.

use thiserror::Error;

use roomhub_core::error::{AppError, ErrorKind};
use roomhub_lock::LockError;

/// Every way a selection operation can fail.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// No available room has this id.
    #[error("Room {room_id} does not exist or is not available")]
    RoomNotFound {
        /// Requested room.
        room_id: String,
    },
    /// The room has no free place.
    #[error("Room {room_id} is full (capacity {capacity})")]
    RoomFull {
        /// Requested room.
        room_id: String,
        /// Room capacity.
        capacity: i32,
    },
    /// The user already holds this room.
    #[error("Room {room_id} is already selected")]
    DuplicateSelection {
        /// Requested room.
        room_id: String,
    },
    /// The user holds no selection.
    #[error("No selection found for {openid}")]
    SelectionNotFound {
        /// User identifier.
        openid: String,
    },
    /// The selection lock stayed busy for the whole retry window.
    #[error("Selection lock '{key}' busy after {attempts} attempts")]
    LockTimeout {
        /// Lock key.
        key: String,
        /// Attempts made.
        attempts: u32,
    },
    /// The caller gave up while waiting for the lock.
    #[error("Selection request cancelled")]
    Cancelled,
    /// The lease ran out before the operation could write.
    #[error("Selection lock lease expired during the operation")]
    LeaseLost,
    /// Store or lock backend failure.
    #[error("Selection failed: {0}")]
    Internal(#[from] AppError),
}

impl SelectionError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LockTimeout { .. } | Self::LeaseLost | Self::Internal(_)
        )
    }
}

impl From<LockError> for SelectionError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { key, attempts } => Self::LockTimeout { key, attempts },
            LockError::Cancelled { .. } => Self::Cancelled,
            LockError::LeaseLost { .. } => Self::LeaseLost,
            LockError::Backend(inner) => Self::Internal(inner),
        }
    }
}

impl From<SelectionError> for AppError {
    fn from(err: SelectionError) -> Self {
        let kind = match &err {
            SelectionError::RoomNotFound { .. } | SelectionError::SelectionNotFound { .. } => {
                ErrorKind::NotFound
            }
            SelectionError::RoomFull { .. } | SelectionError::DuplicateSelection { .. } => {
                ErrorKind::Conflict
            }
            SelectionError::LockTimeout { .. }
            | SelectionError::Cancelled
            | SelectionError::LeaseLost => ErrorKind::ServiceUnavailable,
            SelectionError::Internal(_) => ErrorKind::Internal,
        };
        match err {
            SelectionError::Internal(inner) => inner,
            other => AppError::new(kind, other.to_string()),
        }
    }
}
