//! Data page layout.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       1     type tag (Data)
//! 1       4     next page (same blob, or next free page when empty)
//! 5       1     empty flag
//! 6       2     payload length
//! 8       4088  payload
//! ```

use crate::common::config::{DATA_PAGE_HEADER_SIZE, DATA_PER_PAGE};
use crate::common::{Error, PageId, Result};
use crate::storage::codec;
use crate::storage::page::{PageHeader, PageType};

/// How much of a data page to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRead {
    /// Header and payload.
    Full,
    /// Header only. The payload stays unloaded; `len()` still reports the
    /// stored length.
    HeaderOnly,
}

/// A page holding part of one blob, or a member of the free list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPage {
    page_id: PageId,
    pub next: Option<PageId>,
    is_empty: bool,
    len: u16,
    payload: Vec<u8>,
}

impl DataPage {
    const OFFSET_EMPTY: usize = PageHeader::SIZE;
    const OFFSET_LEN: usize = PageHeader::SIZE + 1;

    /// A fresh empty page that has never been written.
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            next: None,
            is_empty: true,
            len: 0,
            payload: Vec::new(),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Stored payload length. A free page keeps the length it had when it
    /// was released; only [`fill`](Self::fill) changes it.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Loaded payload. Empty if the page was read header-only.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Fill the page with `chunk` and mark it in use.
    ///
    /// # Panics
    /// Panics if `chunk` is larger than a page payload.
    pub fn fill(&mut self, chunk: &[u8]) {
        assert!(chunk.len() <= DATA_PER_PAGE, "chunk exceeds page capacity");
        self.payload.clear();
        self.payload.extend_from_slice(chunk);
        self.len = chunk.len() as u16;
        self.is_empty = false;
    }

    /// Return the page to the empty state. The forward link and the stored
    /// length are kept.
    pub fn mark_empty(&mut self) {
        self.is_empty = true;
        self.payload.clear();
    }

    /// Decode the fixed header region.
    pub fn from_header(page_id: PageId, header: &[u8]) -> Result<Self> {
        let common = PageHeader::from_bytes(header);
        if common.page_type() != Some(PageType::Data) {
            return Err(Error::UnexpectedPageType {
                page_id,
                expected: PageType::Data,
                found: common.type_tag,
            });
        }
        let len = codec::get_u16(header, Self::OFFSET_LEN);
        if len as usize > DATA_PER_PAGE {
            return Err(Error::invalid_format(format!(
                "{page_id} declares {len} payload bytes"
            )));
        }
        Ok(Self {
            page_id,
            next: common.next,
            is_empty: header[Self::OFFSET_EMPTY] != 0,
            len,
            payload: Vec::new(),
        })
    }

    /// Attach the payload bytes read after the header.
    pub(crate) fn set_payload(&mut self, payload: Vec<u8>) {
        debug_assert_eq!(payload.len(), self.len as usize);
        self.payload = payload;
    }

    /// Encode the page. An empty page encodes as its header alone, length
    /// field included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload: &[u8] = if self.is_empty { &[] } else { &self.payload };
        let mut data = vec![0u8; DATA_PAGE_HEADER_SIZE + payload.len()];

        PageHeader::new(PageType::Data, self.next).write_to(&mut data);
        data[Self::OFFSET_EMPTY] = u8::from(self.is_empty);
        codec::put_u16(&mut data, Self::OFFSET_LEN, self.len);
        data[DATA_PAGE_HEADER_SIZE..].copy_from_slice(payload);
        data
    }
}
