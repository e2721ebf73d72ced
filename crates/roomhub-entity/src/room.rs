//! Interview room entity.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A capacity-limited interview time slot.
///
/// `occupancy` stays within `0..=capacity`; it is only changed by the
/// selection allocator and the occupancy reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Room {
    /// Opaque unique room identifier.
    pub room_id: String,
    /// Display name.
    pub name: String,
    /// When the interview takes place (wall-clock time, no zone).
    pub scheduled_time: NaiveDateTime,
    /// Maximum number of selections.
    pub capacity: i32,
    /// Current number of selections.
    pub occupancy: i32,
    /// Where the interview takes place.
    pub location: String,
    /// Unavailable rooms are hidden from listing and allocation.
    pub available: bool,
}

impl Room {
    /// Whether no further selection fits.
    pub fn is_full(&self) -> bool {
        self.occupancy >= self.capacity
    }

    /// Number of selections still accepted.
    pub fn remaining(&self) -> i32 {
        (self.capacity - self.occupancy).max(0)
    }

    /// Calendar day the interview falls on.
    pub fn scheduled_date(&self) -> NaiveDate {
        self.scheduled_time.date()
    }
}

/// Public projection of a room as shown to applicants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomView {
    /// Room identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Interview time.
    pub time: NaiveDateTime,
    /// Maximum number of selections.
    pub capacity: i32,
    /// Current number of selections.
    pub occupancy: i32,
    /// Interview location.
    pub location: String,
}

impl From<Room> for RoomView {
    fn from(room: Room) -> Self {
        Self {
            id: room.room_id,
            name: room.name,
            time: room.scheduled_time,
            capacity: room.capacity,
            occupancy: room.occupancy,
            location: room.location,
        }
    }
}
