//! Workspace integration tests.
//!
//! Everything except `backend_test` runs against the in-memory room store and
//! lease store. Two allocators sharing those stores stand in for two processes.

mod backend_test;
mod helpers;
mod lock_test;
mod selection_test;
