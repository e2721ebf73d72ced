//! Repository implementations for RoomHub tables.

pub mod room;
pub mod selection;

pub use room::RoomRepository;
pub use selection::SelectionRepository;
