//! Free-List Allocator - hands out index slots and data pages.
//!
//! Two independent reuse mechanisms share the header:
//!
//! ```text
//! Index slots (free_index_page):
//!   [root] ──next──▶ [idx 7] ──next──▶ [idx 93]  ◀── free_index_page
//!   Only the last index page has spare slots. When it fills up a new index
//!   page is allocated and linked behind it.
//!
//! Free data pages (free_data_head / free_data_tail):
//!   head ──▶ [D 12] ──▶ [D 13] ──▶ [D 40] ◀── tail
//!   Reclaimed blob chains are appended whole at the tail. Writers take pages
//!   from the head and follow the existing links while they need more.
//! ```
//!
//! Page ids are never returned to the operating system; a page that leaves
//! one list is always reachable from a blob or from the free list.

use tracing::debug;

use crate::buffer::IndexCache;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{DataPage, DataRead, IndexLink, IndexNode, IndexPage};
use crate::storage::{Header, PageStore};

/// Allocation context for one engine operation.
///
/// Borrows the engine's header and page store; every header change goes
/// through the header setters and so marks it dirty.
pub struct Allocator<'a> {
    header: &'a mut Header,
    store: &'a PageStore,
}

impl<'a> Allocator<'a> {
    pub fn new(header: &'a mut Header, store: &'a PageStore) -> Self {
        Self { header, store }
    }

    // ========================================================================
    // INDEX SLOTS
    // ========================================================================

    /// Place `node` in a free index slot and return its address.
    ///
    /// Uses the next unused slot of the header's free index page. If that
    /// page is full, a new index page is allocated with `node` in slot 0,
    /// linked behind the full one and recorded as the new free index page.
    /// Both pages end up dirty in the cache.
    pub fn allocate_index_slot(
        &mut self,
        cache: &mut IndexCache,
        node: IndexNode,
    ) -> Result<IndexLink> {
        let free_id = self.header.free_index_page();

        let node = match cache.get_mut(self.store, free_id)?.reserve_slot(node) {
            Ok(slot) => return Ok(IndexLink::new(free_id, slot)),
            Err(node) => node,
        };

        let new_id = self.header.allocate_page_id();
        cache.get_mut(self.store, free_id)?.next_index_page = Some(new_id);
        cache.put(self.store, IndexPage::new(new_id, node), true)?;
        self.header.set_free_index_page(new_id);

        debug!(full = %free_id, page_id = %new_id, "allocated index page");
        Ok(IndexLink::new(new_id, 0))
    }

    // ========================================================================
    // DATA PAGES
    // ========================================================================

    /// Pick the first page of a new blob chain.
    ///
    /// Pops the head of the free list if there is one, otherwise allocates a
    /// new page id. The popped page keeps its forward link; the chain writer
    /// follows it through [`Allocator::next_data_page`].
    pub fn start_data_page_id(&mut self) -> Result<PageId> {
        let Some(head) = self.header.free_data_head() else {
            let page_id = self.header.allocate_page_id();
            debug!(%page_id, "allocated data page");
            return Ok(page_id);
        };

        let page = self.store.read_data_page(head, DataRead::HeaderOnly)?;
        self.advance_free_head(page.next);
        debug!(page_id = %head, "reused free data page");
        Ok(head)
    }

    /// Load a data page that is about to be written.
    ///
    /// A page beyond the end of the file has never been written and is
    /// materialized as a fresh empty page.
    pub fn load_for_write(&self, page_id: PageId) -> Result<DataPage> {
        if self.store.contains_page(page_id)? {
            self.store.read_data_page(page_id, DataRead::HeaderOnly)
        } else {
            Ok(DataPage::new(page_id))
        }
    }

    /// Write `current` and return the page that follows it in the chain.
    ///
    /// If `current` already links onward, the linked page is the head of
    /// the free list and is taken from it. Otherwise a new page id is
    /// allocated and linked from `current`.
    pub fn next_data_page(&mut self, current: &mut DataPage) -> Result<DataPage> {
        match current.next {
            Some(next_id) => {
                if self.header.free_data_head() != Some(next_id) {
                    return Err(Error::FreeListCorrupted {
                        page_id: next_id,
                        reason: format!(
                            "linked from {} but the free list starts at {:?}",
                            current.page_id(),
                            self.header.free_data_head()
                        ),
                    });
                }
                self.store.write_data_page(current)?;
                let next = self.store.read_data_page(next_id, DataRead::HeaderOnly)?;
                self.advance_free_head(next.next);
                Ok(next)
            }
            None => {
                let next_id = self.header.allocate_page_id();
                current.next = Some(next_id);
                self.store.write_data_page(current)?;
                self.load_for_write(next_id)
            }
        }
    }

    /// Write a page of a chain under construction.
    pub fn write_data_page(&self, page: &DataPage) -> Result<()> {
        self.store.write_data_page(page)
    }

    /// Return the unused rest of a followed free-list run.
    ///
    /// A chain writer that stops on a page taken from the free list leaves
    /// the pages after it unused. They normally still form the head of the
    /// free list, in which case nothing needs to change.
    pub fn release_remainder(&mut self, rest: PageId) -> Result<()> {
        if self.header.free_data_head() == Some(rest) {
            return Ok(());
        }
        self.reclaim_chain(rest)?;
        Ok(())
    }

    /// Empty every page of the chain starting at `first` and append the
    /// chain to the free list.
    ///
    /// Returns the number of pages reclaimed.
    ///
    /// # Errors
    /// `FreeListCorrupted` if the chain is longer than the file (a cycle),
    /// or if the current free-list tail is not an empty terminal page.
    pub fn reclaim_chain(&mut self, first: PageId) -> Result<u64> {
        let limit = self.header.page_count();
        let mut reclaimed = 0u64;
        let mut page_id = first;

        let last = loop {
            reclaimed += 1;
            if reclaimed > limit {
                return Err(Error::FreeListCorrupted {
                    page_id: first,
                    reason: format!("chain is longer than the {limit} allocated pages"),
                });
            }

            let mut page = self.store.read_data_page(page_id, DataRead::HeaderOnly)?;
            page.mark_empty();
            self.store.write_data_page(&page)?;

            match page.next {
                Some(next) => page_id = next,
                None => break page_id,
            }
        };

        match self.header.free_data_tail() {
            None => {
                self.header.set_free_data_head(Some(first));
            }
            Some(tail_id) => {
                let mut tail = self.store.read_data_page(tail_id, DataRead::HeaderOnly)?;
                if !tail.is_empty() {
                    return Err(Error::FreeListCorrupted {
                        page_id: tail_id,
                        reason: "tail page holds data".into(),
                    });
                }
                if tail.next.is_some() {
                    return Err(Error::FreeListCorrupted {
                        page_id: tail_id,
                        reason: "tail page is chained".into(),
                    });
                }
                tail.next = Some(first);
                self.store.write_data_page(&tail)?;
            }
        }
        self.header.set_free_data_tail(Some(last));

        debug!(first = %first, last = %last, pages = reclaimed, "reclaimed chain");
        Ok(reclaimed)
    }

    /// Move the free-list head to `next`, clearing the tail when the list
    /// runs out.
    fn advance_free_head(&mut self, next: Option<PageId>) {
        self.header.set_free_data_head(next);
        if next.is_none() {
            self.header.set_free_data_tail(None);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::NODES_PER_PAGE;
    use crate::common::{AccessMode, EntryId, StoreConfig};
    use tempfile::TempDir;

    fn create_store() -> (PageStore, Header, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::open(
            dir.path().join("alloc.db"),
            AccessMode::ReadWrite,
            &StoreConfig::default(),
        )
        .unwrap();
        let header = store.read_header().unwrap();
        (store, header, dir)
    }

    /// Write a chain of `pages` non-empty pages and return its first id.
    fn write_chain(alloc: &mut Allocator<'_>, pages: usize) -> PageId {
        let first = alloc.start_data_page_id().unwrap();
        let mut page = alloc.load_for_write(first).unwrap();
        page.fill(b"x");
        for _ in 1..pages {
            let mut next = alloc.next_data_page(&mut page).unwrap();
            next.fill(b"y");
            page = next;
        }
        alloc.store.write_data_page(&page).unwrap();
        first
    }

    #[test]
    fn test_index_slots_fill_root_then_chain() {
        let (store, mut header, _dir) = create_store();
        let mut cache = IndexCache::new(8);
        let mut alloc = Allocator::new(&mut header, &store);

        for expected in 1..NODES_PER_PAGE as u8 {
            let link = alloc
                .allocate_index_slot(&mut cache, IndexNode::new(EntryId::generate()))
                .unwrap();
            assert_eq!(link, IndexLink::new(PageId::ROOT, expected));
        }

        let link = alloc
            .allocate_index_slot(&mut cache, IndexNode::new(EntryId::generate()))
            .unwrap();
        assert_eq!(link, IndexLink::new(PageId::new(1), 0));

        assert_eq!(header.free_index_page(), PageId::new(1));
        assert_eq!(header.last_page_id(), PageId::new(1));
        assert!(cache.is_dirty(PageId::ROOT));
        assert!(cache.is_dirty(PageId::new(1)));
        assert_eq!(
            cache.get(&store, PageId::ROOT).unwrap().next_index_page,
            Some(PageId::new(1))
        );
    }

    #[test]
    fn test_fresh_data_pages() {
        let (store, mut header, _dir) = create_store();
        let mut alloc = Allocator::new(&mut header, &store);

        let first = write_chain(&mut alloc, 3);
        assert_eq!(first, PageId::new(1));
        assert_eq!(header.last_page_id(), PageId::new(3));

        let p1 = store.read_data_page(PageId::new(1), DataRead::Full).unwrap();
        assert_eq!(p1.next, Some(PageId::new(2)));
        let p3 = store.read_data_page(PageId::new(3), DataRead::Full).unwrap();
        assert_eq!(p3.next, None);
        assert_eq!(p3.payload(), b"y");
    }

    #[test]
    fn test_reclaim_into_empty_list() {
        let (store, mut header, _dir) = create_store();
        let mut alloc = Allocator::new(&mut header, &store);

        let first = write_chain(&mut alloc, 3);
        assert_eq!(alloc.reclaim_chain(first).unwrap(), 3);

        assert_eq!(header.free_data_head(), Some(PageId::new(1)));
        assert_eq!(header.free_data_tail(), Some(PageId::new(3)));
        for id in 1..=3 {
            let page = store
                .read_data_page(PageId::new(id), DataRead::HeaderOnly)
                .unwrap();
            assert!(page.is_empty());
            // The length field survives reclamation.
            assert_eq!(page.len(), 1);
        }
    }

    #[test]
    fn test_reclaim_appends_at_tail() {
        let (store, mut header, _dir) = create_store();
        let mut alloc = Allocator::new(&mut header, &store);

        let a = write_chain(&mut alloc, 2);
        let b = write_chain(&mut alloc, 1);
        alloc.reclaim_chain(a).unwrap();
        alloc.reclaim_chain(b).unwrap();

        assert_eq!(header.free_data_head(), Some(a));
        assert_eq!(header.free_data_tail(), Some(b));
        let old_tail = store
            .read_data_page(PageId::new(2), DataRead::HeaderOnly)
            .unwrap();
        assert_eq!(old_tail.next, Some(b));
    }

    #[test]
    fn test_reuse_follows_free_links() {
        let (store, mut header, _dir) = create_store();
        let mut alloc = Allocator::new(&mut header, &store);

        let first = write_chain(&mut alloc, 3);
        alloc.reclaim_chain(first).unwrap();

        // Same size chain reuses pages 1..=3 without allocating.
        let again = write_chain(&mut alloc, 3);
        assert_eq!(again, first);
        assert_eq!(header.last_page_id(), PageId::new(3));
        assert_eq!(header.free_data_head(), None);
        assert_eq!(header.free_data_tail(), None);
    }

    #[test]
    fn test_corrupted_tail_detected() {
        let (store, mut header, _dir) = create_store();
        let mut alloc = Allocator::new(&mut header, &store);

        let a = write_chain(&mut alloc, 1);
        let b = write_chain(&mut alloc, 1);
        alloc.reclaim_chain(a).unwrap();

        // Make the tail page hold data again.
        let mut tail = store.read_data_page(a, DataRead::HeaderOnly).unwrap();
        tail.fill(b"oops");
        store.write_data_page(&tail).unwrap();

        let err = alloc.reclaim_chain(b).unwrap_err();
        assert!(matches!(err, Error::FreeListCorrupted { page_id, .. } if page_id == a));
        assert!(err.is_consistency());
    }

    #[test]
    fn test_cycle_detected() {
        let (store, mut header, _dir) = create_store();
        let mut alloc = Allocator::new(&mut header, &store);

        let first = write_chain(&mut alloc, 2);
        let mut last = store
            .read_data_page(PageId::new(2), DataRead::Full)
            .unwrap();
        last.next = Some(first);
        store.write_data_page(&last).unwrap();

        assert!(matches!(
            alloc.reclaim_chain(first),
            Err(Error::FreeListCorrupted { .. })
        ));
    }
}
