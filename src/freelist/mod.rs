//! Space allocation: index node slots and data pages.

mod allocator;

pub use allocator::Allocator;
