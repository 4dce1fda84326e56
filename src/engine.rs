//! Storage engine - one open blob file.
//!
//! # Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Engine                           │
//! │                                                          │
//! │   insert / read / open_read / search / delete / list     │
//! │        │                 │                  │            │
//! │        ▼                 ▼                  ▼            │
//! │  ┌───────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ IndexTree │───▶│  Allocator  │◀───│ blob::chain │     │
//! │  └───────────┘    └─────────────┘    └─────────────┘     │
//! │        │                 │                  │            │
//! │        ▼                 ▼                  │            │
//! │  ┌───────────┐    ┌─────────────┐           │            │
//! │  │IndexCache │    │   Header    │           │            │
//! │  └───────────┘    └─────────────┘           │            │
//! │        │                 │                  │            │
//! │        ▼                 ▼                  ▼            │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │                    PageStore                       │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine owns the header, the page store and the index cache, and
//! lends them to the tree, allocator and chain code for the length of one
//! call. It is single-threaded: wrap it in a mutex to share it.
//!
//! Changes to the header and index pages stay in memory until
//! [`Engine::persist`] or [`Engine::close`]. Data pages are written
//! immediately.

use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::blob::chain::{read_chain, write_chain, MAX_BLOB_LENGTH};
use crate::blob::BlobReader;
use crate::buffer::{CacheStatsSnapshot, IndexCache};
use crate::common::{AccessMode, EntryId, Error, PageId, Result, StoreConfig};
use crate::debug::render_pages;
use crate::entry::{split_file_name, Entry};
use crate::freelist::Allocator;
use crate::index::IndexTree;
use crate::storage::page::{IndexLink, IndexNode};
use crate::storage::{Header, PageStore};

/// An open blob file.
///
/// # Example
/// ```no_run
/// use blobfile::{AccessMode, Engine};
///
/// let mut engine = Engine::open("blobs.db", AccessMode::ReadWrite)?;
/// let entry = engine.insert("hello.txt", &mut "hello".as_bytes())?;
///
/// let mut out = Vec::new();
/// engine.read(&entry.id(), &mut out)?;
/// assert_eq!(out, b"hello");
///
/// engine.close()?;
/// # Ok::<(), blobfile::Error>(())
/// ```
pub struct Engine {
    store: PageStore,
    header: Header,
    cache: IndexCache,
    config: StoreConfig,
    closed: bool,
}

impl Engine {
    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Open a blob file with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<Self> {
        Self::open_with_config(path, mode, StoreConfig::default())
    }

    /// Open a blob file.
    ///
    /// # Errors
    /// - Format errors if the header or root page is not a valid store
    /// - `LockTimeout` if another writer holds the file
    /// - `Io(NotFound)` for a missing file opened read-only
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        mode: AccessMode,
        config: StoreConfig,
    ) -> Result<Self> {
        let store = PageStore::open(path, mode, &config)?;
        let header = store.read_header()?;

        let mut cache =
            IndexCache::new(config.cache_capacity.max(StoreConfig::MIN_CACHE_CAPACITY));
        cache.get(&store, header.root_index_page())?;

        info!(
            path = %store.path().display(),
            ?mode,
            pages = header.page_count(),
            "opened blob file"
        );

        Ok(Self {
            store,
            header,
            cache,
            config,
            closed: false,
        })
    }

    /// Write pending header and index page changes to disk.
    ///
    /// Does nothing on a read-only engine.
    pub fn persist(&mut self) -> Result<()> {
        if !self.mode().is_writable() {
            return Ok(());
        }

        let flushed = self.cache.flush_dirty(&self.store)?;
        let header_written = self.header.is_dirty();
        if header_written {
            self.store.write_header(&self.header)?;
            self.header.clear_dirty();
        }
        if self.config.sync_on_persist {
            self.store.sync()?;
        }

        debug!(flushed, header_written, "persisted");
        Ok(())
    }

    /// Persist, then release the write lock.
    pub fn close(mut self) -> Result<()> {
        self.persist()?;
        self.store.unlock()?;
        self.closed = true;
        info!(path = %self.store.path().display(), "closed blob file");
        Ok(())
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Store everything `input` yields under a new random identifier.
    ///
    /// `name` is split into name and extension, each truncated to its
    /// on-disk width.
    pub fn insert<R: Read + ?Sized>(&mut self, name: &str, input: &mut R) -> Result<Entry> {
        self.insert_with_id(EntryId::generate(), name, input)
    }

    /// Store a blob under a caller-chosen identifier.
    ///
    /// The node is linked into the index flagged deleted and only becomes
    /// visible once its whole chain is written.
    ///
    /// # Errors
    /// - `DuplicateId` if `id` is already present, live or deleted
    /// - `BlobTooLarge` if the input exceeds [`MAX_BLOB_LENGTH`]
    /// - `ReadOnly` on a read-only engine
    pub fn insert_with_id<R: Read + ?Sized>(
        &mut self,
        id: EntryId,
        name: &str,
        input: &mut R,
    ) -> Result<Entry> {
        let (stem, extension) = split_file_name(name);
        self.insert_parts(id, stem, extension, input)
    }

    /// Like [`insert_with_id`](Self::insert_with_id) with the name and
    /// extension fields given separately, as listed entries report them.
    pub(crate) fn insert_parts<R: Read + ?Sized>(
        &mut self,
        id: EntryId,
        name: &str,
        extension: &str,
        input: &mut R,
    ) -> Result<Entry> {
        self.ensure_writable()?;

        let mut node = IndexNode::new(id);
        node.set_file_name(name, extension);
        let link = self.tree().insert(node)?;

        let written = write_chain(&mut self.allocator(), input, MAX_BLOB_LENGTH)?;

        let mut tree = self.tree();
        let node = tree.node_mut(link)?;
        node.data_page = Some(written.first);
        node.length = written.length;
        node.deleted = false;

        debug!(%id, first_page = %written.first, length = written.length, "inserted blob");
        Ok(Entry::from_node(node))
    }

    /// Delete the entry with `id` and return its pages to the free list.
    ///
    /// Returns `false` if there is no live entry with that id; nothing is
    /// changed in that case.
    pub fn delete(&mut self, id: &EntryId) -> Result<bool> {
        self.ensure_writable()?;

        let Some((link, node)) = self.live_node(id)? else {
            return Ok(false);
        };
        let first = data_page_of(&node)?;

        let reclaimed = self.allocator().reclaim_chain(first)?;
        self.tree().node_mut(link)?.deleted = true;

        debug!(%id, reclaimed, "deleted blob");
        Ok(true)
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Look up the entry with `id`.
    pub fn search(&mut self, id: &EntryId) -> Result<Option<Entry>> {
        Ok(self
            .live_node(id)?
            .map(|(_, node)| Entry::from_node(&node)))
    }

    /// Copy the blob with `id` into `output`.
    ///
    /// Returns `None` without touching `output` if there is no such entry.
    pub fn read<W: Write + ?Sized>(&mut self, id: &EntryId, output: &mut W) -> Result<Option<Entry>> {
        let Some((_, node)) = self.live_node(id)? else {
            return Ok(None);
        };
        let first = data_page_of(&node)?;

        let copied = read_chain(&self.store, first, self.header.page_count(), output)?;
        if copied != node.length as u64 {
            return Err(Error::invalid_format(format!(
                "blob {id} holds {copied} bytes but its entry records {}",
                node.length
            )));
        }
        Ok(Some(Entry::from_node(&node)))
    }

    /// Open a streaming reader over the blob with `id`.
    ///
    /// The reader borrows the engine until it is dropped.
    pub fn open_read(&mut self, id: &EntryId) -> Result<Option<BlobReader<'_>>> {
        let Some((_, node)) = self.live_node(id)? else {
            return Ok(None);
        };
        let first = data_page_of(&node)?;

        Ok(Some(BlobReader::new(
            &self.store,
            first,
            node.length as u64,
            self.header.page_count(),
        )))
    }

    /// Every live entry, in index allocation order.
    pub fn list(&mut self) -> Result<Vec<Entry>> {
        let nodes = self.tree().scan()?;
        Ok(nodes
            .iter()
            .filter(|node| !node.deleted)
            .map(Entry::from_node)
            .collect())
    }

    /// Human-readable listing of every page, after persisting.
    pub fn dump_pages(&mut self) -> Result<String> {
        self.persist()?;
        render_pages(&self.store, &self.header)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    #[inline]
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    #[inline]
    pub fn mode(&self) -> AccessMode {
        self.store.mode()
    }

    #[inline]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// In-memory header, including changes not yet persisted.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats().snapshot()
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn tree(&mut self) -> IndexTree<'_> {
        IndexTree::new(&mut self.cache, &self.store, &mut self.header)
    }

    fn allocator(&mut self) -> Allocator<'_> {
        Allocator::new(&mut self.header, &self.store)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.mode().is_writable() {
            Ok(())
        } else {
            Err(Error::ReadOnly)
        }
    }

    /// Address and copy of the live node with `id`.
    fn live_node(&mut self, id: &EntryId) -> Result<Option<(IndexLink, IndexNode)>> {
        let mut tree = self.tree();
        let Some(link) = tree.search(id)? else {
            return Ok(None);
        };
        let node = tree.node(link)?;
        if node.deleted {
            return Ok(None);
        }
        Ok(Some((link, node.clone())))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.persist() {
            warn!(path = %self.store.path().display(), error = %e, "persist on drop failed");
        }
        if let Err(e) = self.store.unlock() {
            warn!(path = %self.store.path().display(), error = %e, "unlock on drop failed");
        }
    }
}

fn data_page_of(node: &IndexNode) -> Result<PageId> {
    node.data_page.ok_or_else(|| {
        Error::invalid_format(format!("live entry {} has no data page", node.id))
    })
}

// ============================================================================
// TESTS
// ============================================================================
