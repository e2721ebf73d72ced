//! Room listing and occupancy maintenance.

pub mod catalog;
pub mod reconciler;

pub use catalog::RoomCatalog;
pub use reconciler::{OccupancyCorrection, OccupancyReconciler, ReconcileReport};
