//! Date-based room listing. Reads are advisory and never take the lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use roomhub_core::error::AppError;
use roomhub_core::result::AppResult;
use roomhub_database::store::RoomStore;
use roomhub_entity::room::Room;

/// Format accepted by [`RoomCatalog::list_rooms_on`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Lists available rooms by calendar day.
#[derive(Debug, Clone)]
pub struct RoomCatalog {
    /// Room persistence.
    store: Arc<dyn RoomStore>,
}

impl RoomCatalog {
    /// Creates a new room catalog.
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self { store }
    }

    /// Available rooms scheduled on `date`, ordered by time.
    pub async fn list_rooms(&self, date: NaiveDate) -> AppResult<Vec<Room>> {
        let start = date.and_time(NaiveTime::MIN);
        let end = date
            .succ_opt()
            .map(|next| next.and_time(NaiveTime::MIN))
            .ok_or_else(|| AppError::validation(format!("Date {date} is out of range")))?;

        let rooms = self.store.find_rooms_by_time_range(start, end, true).await?;
        debug!(date = %date, count = rooms.len(), "Listed rooms");
        Ok(rooms)
    }

    /// Like [`Self::list_rooms`] for a `YYYY-MM-DD` string.
    pub async fn list_rooms_on(&self, date: &str) -> AppResult<Vec<Room>> {
        let date = parse_date(date)?;
        self.list_rooms(date).await
    }

    /// Distinct days that have at least one available room, ascending.
    pub async fn list_available_dates(&self) -> AppResult<Vec<NaiveDate>> {
        let rooms = self.store.list_rooms(true).await?;
        let dates: BTreeSet<NaiveDate> = rooms.iter().map(Room::scheduled_date).collect();
        Ok(dates.into_iter().collect())
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| AppError::validation(format!("Invalid date '{date}', expected YYYY-MM-DD")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use roomhub_core::error::ErrorKind;
    use roomhub_database::store::MemoryRoomStore;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn room(room_id: &str, time: NaiveDateTime, available: bool) -> Room {
        Room {
            room_id: room_id.to_string(),
            name: room_id.to_uppercase(),
            scheduled_time: time,
            capacity: 3,
            occupancy: 0,
            location: "Hall".to_string(),
            available,
        }
    }

    async fn catalog() -> RoomCatalog {
        let store = MemoryRoomStore::new();
        store.insert_room(room("a", at("2024-09-14", "00:00:00"), true)).await;
        store.insert_room(room("b", at("2024-09-14", "23:59:59"), true)).await;
        store.insert_room(room("c", at("2024-09-15", "00:00:00"), true)).await;
        store.insert_room(room("d", at("2024-09-14", "12:00:00"), false)).await;
        store.insert_room(room("e", at("2024-09-20", "10:00:00"), false)).await;
        store.insert_room(room("f", at("2024-09-13", "10:00:00"), true)).await;
        RoomCatalog::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_list_rooms_covers_one_day() {
        let catalog = catalog().await;
        let rooms = catalog
            .list_rooms(NaiveDate::from_ymd_opt(2024, 9, 14).unwrap())
            .await
            .unwrap();
        let ids: Vec<_> = rooms.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_list_rooms_on_empty_day() {
        let catalog = catalog().await;
        assert!(catalog.list_rooms_on("2024-09-20").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_date_is_validation_error() {
        let catalog = catalog().await;
        let err = catalog.list_rooms_on("14/09/2024").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_available_dates_are_distinct_and_sorted() {
        let catalog = catalog().await;
        let dates = catalog.list_available_dates().await.unwrap();
        let expected: Vec<NaiveDate> = ["2024-09-13", "2024-09-14", "2024-09-15"]
            .iter()
            .map(|d| parse_date(d).unwrap())
            .collect();
        assert_eq!(dates, expected);
    }
}
