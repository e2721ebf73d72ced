//! # roomhub-database
//!
//! PostgreSQL connection management, migrations, and the [`RoomStore`]
//! abstraction the allocator runs against, with a PostgreSQL and an
//! in-memory implementation.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{MemoryRoomStore, PgRoomStore, RoomStore};
