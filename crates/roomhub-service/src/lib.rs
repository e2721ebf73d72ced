//! # roomhub-service
//!
//! Room selection use cases. Every service takes its store and lock through
//! its constructor as `Arc` references; nothing is looked up globally.
//!
//! - `selection` — the lock-serialized selection allocator
//! - `room` — date-based room listing and occupancy reconciliation

pub mod error;
pub mod room;
pub mod selection;

pub use error::SelectionError;
pub use room::{OccupancyReconciler, ReconcileReport, RoomCatalog};
pub use selection::SelectionAllocator;
