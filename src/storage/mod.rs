//! Storage layer - disk I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`PageStore`] - File I/O, page offsets and the write lock
//! - [`Header`] - The file header region
//! - [`page`] - Page types and layouts

pub(crate) mod codec;
mod header;
mod lock;
pub mod page;
mod page_store;

pub use header::Header;
pub use page_store::PageStore;
