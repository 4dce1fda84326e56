//! Common types and utilities shared across blobfile.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and runtime knobs
//! - Error types
//! - Identifiers (PageId, EntryId)

pub mod config;
pub mod error;
mod entry_id;
mod page_id;

pub use config::{AccessMode, StoreConfig, StoreConfigBuilder};
pub use entry_id::EntryId;
pub use error::{Error, Result};
pub use page_id::PageId;
