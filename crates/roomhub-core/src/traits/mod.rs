//! Core traits defined in `roomhub-core` and implemented by other crates.

pub mod lease;

pub use lease::LeaseStore;
