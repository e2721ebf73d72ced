//! Per-user room selection.

pub mod allocator;

pub use allocator::SelectionAllocator;
