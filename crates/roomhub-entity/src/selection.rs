//! Room selection entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user's current room assignment.
///
/// There is at most one row per `openid`. A change of room deletes this row
/// and creates a new one; rows are never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Selection {
    /// The user's OpenID subject.
    pub openid: String,
    /// The selected room.
    pub room_id: String,
    /// When the selection was made.
    pub created_at: DateTime<Utc>,
}
