//! # roomhub-entity
//!
//! Domain entity models for RoomHub. Every struct in this crate represents a
//! database table row or a domain value object. Database entities derive
//! `sqlx::FromRow`.

pub mod room;
pub mod selection;

pub use room::{Room, RoomView};
pub use selection::Selection;
