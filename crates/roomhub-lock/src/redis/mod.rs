//! Redis lease store implementation.

pub mod client;
pub mod lease;

pub use client::RedisClient;
pub use lease::RedisLeaseStore;
