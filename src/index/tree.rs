//! Identifier index - an unbalanced binary search tree embedded in index
//! pages.
//!
//! # Structure
//! ```text
//!                 [P0 s0] sentinel (0x7F…7F, deleted)
//!                /         \
//!         [P0 s2]           [P0 s1]
//!         /     \                \
//!    [P1 s0]   [P0 s5]          [P0 s3]
//!     larger keys              smaller keys
//! ```
//!
//! Every node is addressed by an [`IndexLink`] (page, slot). The sentinel in
//! slot 0 of page 0 is the permanent root, so the tree is never empty. Keys
//! smaller than a node's id go right, larger keys go left. This mirrored
//! orientation is part of the file format; see [`EntryId`] for the key
//! ordering.
//!
//! Nodes are never removed. Deleting an entry only sets its `deleted` flag,
//! so the tree only grows. No rebalancing is done; identifiers are random,
//! which keeps the expected depth logarithmic.

use std::cmp::Ordering;

use crate::buffer::IndexCache;
use crate::common::config::NODES_PER_PAGE;
use crate::common::{EntryId, Error, Result};
use crate::freelist::Allocator;
use crate::storage::page::{IndexLink, IndexNode, Side};
use crate::storage::{Header, PageStore};

/// Direction to follow from a node with key `key` when looking for `target`.
///
/// `None` means the node is the target.
#[inline]
fn descend(target: &EntryId, key: &EntryId) -> Option<Side> {
    match target.cmp(key) {
        Ordering::Less => Some(Side::Right),
        Ordering::Greater => Some(Side::Left),
        Ordering::Equal => None,
    }
}

/// The identifier index for one engine operation.
///
/// Borrows the index cache for page access and the header and page store
/// for slot allocation.
pub struct IndexTree<'a> {
    cache: &'a mut IndexCache,
    store: &'a PageStore,
    header: &'a mut Header,
}

impl<'a> IndexTree<'a> {
    pub fn new(cache: &'a mut IndexCache, store: &'a PageStore, header: &'a mut Header) -> Self {
        Self {
            cache,
            store,
            header,
        }
    }

    /// Find the node with key `id`.
    ///
    /// Returns the node's address, deleted or not. Absence is `Ok(None)`.
    pub fn search(&mut self, id: &EntryId) -> Result<Option<IndexLink>> {
        let max_steps = self.max_depth();
        let mut cursor = IndexLink::ROOT;

        for _ in 0..max_steps {
            let node = self.node(cursor)?;
            let Some(side) = descend(id, &node.id) else {
                return Ok(Some(cursor));
            };
            match node.child(side) {
                Some(child) => cursor = child,
                None => return Ok(None),
            }
        }
        Err(self.cycle_error(cursor))
    }

    /// Insert a new node and link it below its parent.
    ///
    /// # Errors
    /// `DuplicateId` if a node with the same key exists, live or deleted.
    pub fn insert(&mut self, node: IndexNode) -> Result<IndexLink> {
        let max_steps = self.max_depth();
        let mut cursor = IndexLink::ROOT;

        for _ in 0..max_steps {
            let parent = self.node(cursor)?;
            let Some(side) = descend(&node.id, &parent.id) else {
                return Err(Error::DuplicateId(node.id));
            };
            if let Some(child) = parent.child(side) {
                cursor = child;
                continue;
            }

            let link =
                Allocator::new(self.header, self.store).allocate_index_slot(self.cache, node)?;
            // Allocation may have evicted the parent's page; fetch it again.
            self.node_mut(cursor)?.set_child(side, link);
            return Ok(link);
        }
        Err(self.cycle_error(cursor))
    }

    /// Read the node at `link`.
    pub fn node(&mut self, link: IndexLink) -> Result<&IndexNode> {
        let page = self.cache.get(self.store, link.page_id)?;
        page.node(link.slot)
            .ok_or_else(|| dangling_link(link, page.highest_slot()))
    }

    /// Modify the node at `link`. Its page becomes dirty.
    pub fn node_mut(&mut self, link: IndexLink) -> Result<&mut IndexNode> {
        let page = self.cache.get_mut(self.store, link.page_id)?;
        let highest_slot = page.highest_slot();
        page.node_mut(link.slot)
            .ok_or_else(|| dangling_link(link, highest_slot))
    }

    /// Every node in allocation order: the index page chain from the root,
    /// slot by slot. Deleted nodes and the sentinel are included.
    pub fn scan(&mut self) -> Result<Vec<IndexNode>> {
        let limit = self.header.page_count();
        let mut nodes = Vec::new();
        let mut next = Some(self.header.root_index_page());
        let mut visited = 0u64;

        while let Some(page_id) = next {
            visited += 1;
            if visited > limit {
                return Err(Error::invalid_format(format!(
                    "index page chain loops back through {page_id}"
                )));
            }
            let page = self.cache.get(self.store, page_id)?;
            nodes.extend(page.nodes().cloned());
            next = page.next_index_page;
        }
        Ok(nodes)
    }

    /// Upper bound on the depth of a well-formed tree.
    fn max_depth(&self) -> u64 {
        self.header.page_count() * NODES_PER_PAGE as u64
    }

    fn cycle_error(&self, at: IndexLink) -> Error {
        Error::invalid_format(format!(
            "index tree has a cycle through {} slot {}",
            at.page_id, at.slot
        ))
    }
}

fn dangling_link(link: IndexLink, highest_slot: u8) -> Error {
    Error::invalid_format(format!(
        "link to {} slot {} but only slots 0..={} are in use",
        link.page_id, link.slot, highest_slot
    ))
}

// ============================================================================
// TESTS
// ============================================================================
