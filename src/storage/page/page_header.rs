//! Page header and type definitions.
//!
//! Every page starts with the same 5 bytes:
//! - [`PageType`] discriminator
//! - forward pointer to another page (meaning depends on the page role)

use crate::common::PageId;
use crate::storage::codec;

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Holds up to 4088 bytes of one blob.
    Data = 1,
    /// Holds up to 50 identifier index nodes.
    Index = 2,
}

impl PageType {
    /// Convert from u8, returning `None` for unknown tags.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(PageType::Data),
            2 => Some(PageType::Index),
            _ => None,
        }
    }
}

/// Fields common to both page kinds.
///
/// # Layout (5 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     type tag (PageType as u8)
/// 1       4     next page id (u32::MAX = none)
/// ```
///
/// For a data page, `next` is the following page of the same blob, or the
/// following page of the free list once the page is empty. For an index page
/// it is the next index page in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Raw type tag. Kept raw so a mismatch can be reported as read.
    pub type_tag: u8,
    /// Forward pointer.
    pub next: Option<PageId>,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 5;

    /// Offset of each field within the header.
    pub const OFFSET_TYPE: usize = 0;
    pub const OFFSET_NEXT: usize = 1;

    pub fn new(page_type: PageType, next: Option<PageId>) -> Self {
        Self {
            type_tag: page_type as u8,
            next,
        }
    }

    /// Decoded page type, if the tag is known.
    pub fn page_type(&self) -> Option<PageType> {
        PageType::from_u8(self.type_tag)
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        Self {
            type_tag: data[Self::OFFSET_TYPE],
            next: PageId::from_raw(codec::get_u32(data, Self::OFFSET_NEXT)),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_TYPE] = self.type_tag;
        codec::put_u32(data, Self::OFFSET_NEXT, PageId::to_raw(self.next));
    }
}

// ============================================================================
// TESTS
// ============================================================================
