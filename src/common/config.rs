//! Configuration for blobfile.
//!
//! Two kinds of settings live here:
//! - Format constants. They are part of the on-disk layout and never change
//!   for a given file version.
//! - [`StoreConfig`], the runtime knobs of an open engine.

use std::time::Duration;

// ============================================================================
// FILE FORMAT
// ============================================================================

/// Size of a page in bytes (4KB).
///
/// # File Layout
/// ```text
/// ┌──────────┬─────────┬─────────┬─────────┬─────────┐
/// │  Header  │ Page 0  │ Page 1  │  ...    │ Page N  │
/// │ (100 B)  │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └──────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset: 0   100      4196              100 + N×4096
/// ```
pub const PAGE_SIZE: usize = 4096;

/// Size of the header region at the start of the file.
pub const HEADER_SIZE: usize = 100;

/// Byte inside the header region reserved for the writer lock.
pub const LOCK_BYTE_OFFSET: u64 = 98;

/// Magic string identifying a blobfile store.
pub const FILE_MAGIC: &[u8; 6] = b"FileDB";

/// Current file format version.
pub const FILE_VERSION: u16 = 1;

/// Bytes reserved in front of the node records of an index page.
///
/// Only the first 6 are used: type tag, next index page, highest slot.
pub const INDEX_PAGE_HEADER_SIZE: usize = 46;

/// Number of node slots per index page.
pub const NODES_PER_PAGE: usize = 50;

/// Width of one serialized index node.
pub const INDEX_NODE_SIZE: usize = 81;

/// Width of the file name field (without extension).
pub const NAME_FIELD_SIZE: usize = 41;

/// Width of the extension field (without the dot).
pub const EXTENSION_FIELD_SIZE: usize = 5;

/// Bytes in front of the payload of a data page.
pub const DATA_PAGE_HEADER_SIZE: usize = 8;

/// Payload capacity of a data page.
pub const DATA_PER_PAGE: usize = PAGE_SIZE - DATA_PAGE_HEADER_SIZE;

// ============================================================================
// RUNTIME CONFIGURATION
// ============================================================================

/// How a store file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Shared read access. No lock is taken and mutations fail.
    ReadOnly,
    /// Exclusive writer. Creates the file if missing and takes the write lock.
    ReadWrite,
}

impl AccessMode {
    #[inline]
    pub fn is_writable(self) -> bool {
        self == AccessMode::ReadWrite
    }
}

/// Runtime configuration of an engine.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of index pages held by the index page cache.
    pub cache_capacity: usize,

    /// Number of attempts made to take the write lock.
    pub lock_retry_limit: u32,

    /// Backoff unit between lock attempts. Attempt `n` sleeps `n × delay`.
    pub lock_retry_delay: Duration,

    /// Call `fsync` after every `persist()`.
    pub sync_on_persist: bool,
}

impl StoreConfig {
    /// Smallest usable cache: the pinned root page plus one evictable slot.
    pub const MIN_CACHE_CAPACITY: usize = 2;

    /// Create a new config builder.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 200,
            lock_retry_limit: 50,
            lock_retry_delay: Duration::from_millis(50),
            sync_on_persist: true,
        }
    }
}

/// Builder for [`StoreConfig`].
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the index page cache bound (clamped to at least 2).
    pub fn cache_capacity(mut self, pages: usize) -> Self {
        self.config.cache_capacity = pages.max(StoreConfig::MIN_CACHE_CAPACITY);
        self
    }

    /// Set the number of lock attempts (at least 1).
    pub fn lock_retry_limit(mut self, attempts: u32) -> Self {
        self.config.lock_retry_limit = attempts.max(1);
        self
    }

    /// Set the lock backoff unit.
    pub fn lock_retry_delay(mut self, delay: Duration) -> Self {
        self.config.lock_retry_delay = delay;
        self
    }

    /// Enable or disable `fsync` on persist.
    pub fn sync_on_persist(mut self, sync: bool) -> Self {
        self.config.sync_on_persist = sync;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_page_fills_a_page() {
        assert_eq!(
            INDEX_PAGE_HEADER_SIZE + NODES_PER_PAGE * INDEX_NODE_SIZE,
            PAGE_SIZE
        );
    }

    #[test]
    fn test_data_page_capacity() {
        assert_eq!(DATA_PER_PAGE, 4088);
        assert_eq!(DATA_PAGE_HEADER_SIZE + DATA_PER_PAGE, PAGE_SIZE);
    }

    #[test]
    fn test_lock_byte_inside_header() {
        assert!((LOCK_BYTE_OFFSET as usize) < HEADER_SIZE);
    }

    #[test]
    fn test_builder_defaults() {
        let config = StoreConfig::builder().build();
        assert_eq!(config.cache_capacity, 200);
        assert_eq!(config.lock_retry_limit, 50);
        assert_eq!(config.lock_retry_delay, Duration::from_millis(50));
        assert!(config.sync_on_persist);
    }

    #[test]
    fn test_builder_clamps() {
        let config = StoreConfig::builder()
            .cache_capacity(0)
            .lock_retry_limit(0)
            .build();
        assert_eq!(config.cache_capacity, StoreConfig::MIN_CACHE_CAPACITY);
        assert_eq!(config.lock_retry_limit, 1);
    }
}
