//! File header.
//!
//! The first [`HEADER_SIZE`] bytes of the file. Layout:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       6     magic "FileDB"
//! 6       2     format version
//! 8       4     root index page (always 0)
//! 12      4     free index page (index page with spare slots)
//! 16      4     free data list head
//! 20      4     free data list tail
//! 24      4     last allocated page id
//! 28      70    unused
//! 98      1     reserved lock byte
//! 99      1     unused
//! ```

use crate::common::config::{FILE_MAGIC, FILE_VERSION, HEADER_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::codec;

/// In-memory copy of the file header.
///
/// Every setter marks the header dirty; only a successful persist clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    root_index_page: PageId,
    free_index_page: PageId,
    free_data_head: Option<PageId>,
    free_data_tail: Option<PageId>,
    last_page_id: PageId,
    dirty: bool,
}

impl Header {
    const OFFSET_MAGIC: usize = 0;
    const OFFSET_VERSION: usize = 6;
    const OFFSET_ROOT: usize = 8;
    const OFFSET_FREE_INDEX: usize = 12;
    const OFFSET_FREE_HEAD: usize = 16;
    const OFFSET_FREE_TAIL: usize = 20;
    const OFFSET_LAST_PAGE: usize = 24;

    /// Header of a freshly created file: only the root page exists.
    pub fn new() -> Self {
        Self {
            root_index_page: PageId::ROOT,
            free_index_page: PageId::ROOT,
            free_data_head: None,
            free_data_tail: None,
            last_page_id: PageId::ROOT,
            dirty: true,
        }
    }

    /// Decode and validate a header region.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::invalid_format(format!(
                "file is {} bytes, shorter than the header",
                data.len()
            )));
        }
        if &data[Self::OFFSET_MAGIC..Self::OFFSET_VERSION] != FILE_MAGIC {
            return Err(Error::invalid_format("bad magic"));
        }
        let version = codec::get_u16(data, Self::OFFSET_VERSION);
        if version != FILE_VERSION {
            return Err(Error::UnsupportedVersion { found: version });
        }
        let root = PageId::new(codec::get_u32(data, Self::OFFSET_ROOT));
        if root != PageId::ROOT {
            return Err(Error::invalid_format(format!("root index is {root}")));
        }
        let last_page_id = PageId::new(codec::get_u32(data, Self::OFFSET_LAST_PAGE));
        if !last_page_id.is_valid() {
            return Err(Error::invalid_format("last page id is the sentinel"));
        }

        Ok(Self {
            root_index_page: root,
            free_index_page: PageId::new(codec::get_u32(data, Self::OFFSET_FREE_INDEX)),
            free_data_head: PageId::from_raw(codec::get_u32(data, Self::OFFSET_FREE_HEAD)),
            free_data_tail: PageId::from_raw(codec::get_u32(data, Self::OFFSET_FREE_TAIL)),
            last_page_id,
            dirty: false,
        })
    }

    /// Encode the full header region.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut data = [0u8; HEADER_SIZE];
        data[Self::OFFSET_MAGIC..Self::OFFSET_VERSION].copy_from_slice(FILE_MAGIC);
        codec::put_u16(&mut data, Self::OFFSET_VERSION, FILE_VERSION);
        codec::put_u32(&mut data, Self::OFFSET_ROOT, self.root_index_page.0);
        codec::put_u32(&mut data, Self::OFFSET_FREE_INDEX, self.free_index_page.0);
        codec::put_u32(
            &mut data,
            Self::OFFSET_FREE_HEAD,
            PageId::to_raw(self.free_data_head),
        );
        codec::put_u32(
            &mut data,
            Self::OFFSET_FREE_TAIL,
            PageId::to_raw(self.free_data_tail),
        );
        codec::put_u32(&mut data, Self::OFFSET_LAST_PAGE, self.last_page_id.0);
        data
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[inline]
    pub fn root_index_page(&self) -> PageId {
        self.root_index_page
    }

    #[inline]
    pub fn free_index_page(&self) -> PageId {
        self.free_index_page
    }

    #[inline]
    pub fn free_data_head(&self) -> Option<PageId> {
        self.free_data_head
    }

    #[inline]
    pub fn free_data_tail(&self) -> Option<PageId> {
        self.free_data_tail
    }

    /// Highest page id handed out so far.
    #[inline]
    pub fn last_page_id(&self) -> PageId {
        self.last_page_id
    }

    /// Number of pages allocated, root included.
    #[inline]
    pub fn page_count(&self) -> u64 {
        self.last_page_id.0 as u64 + 1
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ------------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------------

    pub(crate) fn set_free_index_page(&mut self, page_id: PageId) {
        self.free_index_page = page_id;
        self.dirty = true;
    }

    pub(crate) fn set_free_data_head(&mut self, page_id: Option<PageId>) {
        self.free_data_head = page_id;
        self.dirty = true;
    }

    pub(crate) fn set_free_data_tail(&mut self, page_id: Option<PageId>) {
        self.free_data_tail = page_id;
        self.dirty = true;
    }

    /// Hand out the next never-used page id.
    pub(crate) fn allocate_page_id(&mut self) -> PageId {
        self.last_page_id = self.last_page_id.next();
        self.dirty = true;
        self.last_page_id
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}
