//! # roomhub-core
//!
//! Core crate for RoomHub. Contains the configuration schemas, the lease
//! store trait implemented by the lock backends, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other RoomHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
