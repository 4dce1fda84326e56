//! Index Page Cache - keeps hot index pages in memory.
//!
//! The [`IndexCache`] provides:
//! - Load-on-miss through the [`PageStore`]
//! - Dirty tracking with a single write-back pass ([`IndexCache::flush_dirty`])
//! - A bounded size with FIFO eviction; the root page is never evicted

use std::collections::HashMap;

use tracing::debug;

use crate::buffer::frame::{Frame, FrameId};
use crate::buffer::replacer::FifoReplacer;
use crate::buffer::CacheStats;
use crate::common::{PageId, Result};
use crate::storage::page::IndexPage;
use crate::storage::PageStore;

/// Bounded cache of index pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────┐
/// │                      IndexCache                         │
/// │  ┌──────────────┐  ┌───────────────────────────────┐    │
/// │  │ page_table   │  │     frames: Vec<Frame>        │    │
/// │  │PageId → Fid  │─▶│  [root] [page] [page] ...     │    │
/// │  └──────────────┘  └───────────────────────────────┘    │
/// │  ┌──────────────┐  ┌──────────────┐                     │
/// │  │   replacer   │  │    stats     │                     │
/// │  │ FifoReplacer │  │  CacheStats  │                     │
/// │  └──────────────┘  └──────────────┘                     │
/// └─────────────────────────────────────────────────────────┘
/// ```
///
/// The cache is the sole owner of loaded pages. Callers borrow a page by id
/// for the duration of one call and fetch it again after anything that may
/// have evicted it.
///
/// Frames are created on demand until `capacity` is reached; after that a
/// miss reuses the frame of the oldest unpinned page, writing it back first
/// if dirty.
pub struct IndexCache {
    frames: Vec<Frame>,
    page_table: HashMap<PageId, FrameId>,
    replacer: FifoReplacer,
    capacity: usize,
    stats: CacheStats,
}

impl IndexCache {
    /// Create an empty cache holding at most `capacity` pages.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");

        Self {
            frames: Vec::with_capacity(capacity),
            page_table: HashMap::with_capacity(capacity),
            replacer: FifoReplacer::new(),
            capacity,
            stats: CacheStats::new(),
        }
    }

    // ========================================================================
    // Public API
    // ========================================================================

    /// Fetch a page for reading, loading it if needed.
    pub fn get(&mut self, store: &PageStore, page_id: PageId) -> Result<&IndexPage> {
        let frame_id = self.fetch_frame(store, page_id)?;
        Ok(&self.frames[frame_id.0].page)
    }

    /// Fetch a page for modification and mark it dirty.
    pub fn get_mut(&mut self, store: &PageStore, page_id: PageId) -> Result<&mut IndexPage> {
        let frame_id = self.fetch_frame(store, page_id)?;
        let frame = &mut self.frames[frame_id.0];
        frame.dirty = true;
        Ok(&mut frame.page)
    }

    /// Insert a page that was built in memory.
    ///
    /// If the page is already cached its contents are replaced; it stays
    /// dirty if it was.
    pub fn put(&mut self, store: &PageStore, page: IndexPage, dirty: bool) -> Result<()> {
        let page_id = page.page_id();

        if let Some(&frame_id) = self.page_table.get(&page_id) {
            let frame = &mut self.frames[frame_id.0];
            frame.dirty |= dirty;
            frame.page = page;
            return Ok(());
        }

        self.install(store, Frame::new(page, dirty))?;
        Ok(())
    }

    /// Write every dirty page and clear its dirty bit. Nothing is evicted.
    ///
    /// Returns the number of pages written.
    pub fn flush_dirty(&mut self, store: &PageStore) -> Result<usize> {
        let mut flushed = 0;
        for frame in self.frames.iter_mut().filter(|frame| frame.dirty) {
            store.write_index_page(&frame.page)?;
            frame.dirty = false;
            CacheStats::record(&self.stats.pages_flushed);
            flushed += 1;
        }
        Ok(flushed)
    }

    /// True if the page is currently cached.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains_key(&page_id)
    }

    /// True if the page is cached and has unwritten changes.
    pub fn is_dirty(&self, page_id: PageId) -> bool {
        self.page_table
            .get(&page_id)
            .is_some_and(|frame_id| self.frames[frame_id.0].dirty)
    }

    /// Number of cached pages.
    #[inline]
    pub fn len(&self) -> usize {
        self.page_table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_table.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    // ========================================================================
    // Internal: loading and eviction
    // ========================================================================

    /// Return the frame holding `page_id`, loading it on a miss.
    fn fetch_frame(&mut self, store: &PageStore, page_id: PageId) -> Result<FrameId> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            CacheStats::record(&self.stats.hits);
            return Ok(frame_id);
        }

        CacheStats::record(&self.stats.misses);
        let page = store.read_index_page(page_id)?;
        CacheStats::record(&self.stats.pages_loaded);

        self.install(store, Frame::new(page, false))
    }

    /// Place a new page in a frame, evicting if the cache is full.
    fn install(&mut self, store: &PageStore, frame: Frame) -> Result<FrameId> {
        let page_id = frame.page.page_id();

        let frame_id = match self.victim(store)? {
            Some(frame_id) => {
                self.frames[frame_id.0] = frame;
                frame_id
            }
            None => {
                self.frames.push(frame);
                FrameId(self.frames.len() - 1)
            }
        };

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_load(frame_id);
        self.replacer.set_pinned(frame_id, page_id == PageId::ROOT);

        Ok(frame_id)
    }

    /// Free a frame if the cache is full.
    ///
    /// Returns `None` when a new frame can be appended instead.
    fn victim(&mut self, store: &PageStore) -> Result<Option<FrameId>> {
        if self.frames.len() < self.capacity {
            return Ok(None);
        }
        let Some(frame_id) = self.replacer.evict() else {
            // Everything is pinned; grow past the bound instead of failing.
            return Ok(None);
        };

        let frame = &mut self.frames[frame_id.0];
        let page_id = frame.page.page_id();
        if frame.dirty {
            store.write_index_page(&frame.page)?;
            frame.dirty = false;
            CacheStats::record(&self.stats.pages_flushed);
        }
        self.page_table.remove(&page_id);
        CacheStats::record(&self.stats.evictions);
        debug!(%page_id, %frame_id, "evicted index page");

        Ok(Some(frame_id))
    }
}

// ============================================================================
// TESTS
// ============================================================================
