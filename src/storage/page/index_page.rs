//! Index page layout.
//!
//! An index page stores up to [`NODES_PER_PAGE`] tree nodes. The tree edges
//! live inside the nodes as [`IndexLink`]s; the page's own forward pointer
//! (`next_index_page`) is the allocation chain and has nothing to do with
//! the tree shape.
//!
//! # Layout
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ type tag (1) │ next index page (4) │ hi (1) │  ← padded to 46 bytes
//! ├──────────────────────────────────────────────┤
//! │ node 0  (81 bytes)                           │
//! │ node 1                                       │
//! │ ...                                          │
//! │ node hi                                      │  ← slots 0..=hi in use
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Only the header and the used slots are written; the rest of the page is
//! never touched.

use crate::common::config::{
    EXTENSION_FIELD_SIZE, INDEX_NODE_SIZE, INDEX_PAGE_HEADER_SIZE, NAME_FIELD_SIZE,
    NODES_PER_PAGE,
};
use crate::common::{EntryId, Error, PageId, Result};
use crate::storage::codec;
use crate::storage::page::{PageHeader, PageType};

// ============================================================================
// INDEX LINK
// ============================================================================

/// Address of a node: page plus slot within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexLink {
    pub page_id: PageId,
    pub slot: u8,
}

impl IndexLink {
    /// Encoded width: slot (1) + page id (4).
    pub const SIZE: usize = 5;

    /// The sentinel node: slot 0 of the root page.
    pub const ROOT: IndexLink = IndexLink {
        page_id: PageId::ROOT,
        slot: 0,
    };

    pub fn new(page_id: PageId, slot: u8) -> Self {
        Self { page_id, slot }
    }

    fn decode(buf: &[u8]) -> Option<Self> {
        PageId::from_raw(codec::get_u32(buf, 1)).map(|page_id| IndexLink {
            page_id,
            slot: buf[0],
        })
    }

    fn encode(link: Option<Self>, buf: &mut [u8]) {
        match link {
            Some(link) => {
                buf[0] = link.slot;
                codec::put_u32(buf, 1, link.page_id.0);
            }
            None => {
                buf[0] = 0;
                codec::put_u32(buf, 1, PageId::INVALID.0);
            }
        }
    }
}

// ============================================================================
// INDEX NODE
// ============================================================================

/// Which child of a node a descent follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One tree record.
///
/// # Layout (81 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       16    id
/// 16      1     deleted flag
/// 17      5     right link
/// 22      5     left link
/// 27      4     first data page id
/// 31      41    name (no extension)
/// 72      5     extension (no dot)
/// 77      4     blob length
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNode {
    pub id: EntryId,
    pub deleted: bool,
    pub right: Option<IndexLink>,
    pub left: Option<IndexLink>,
    pub data_page: Option<PageId>,
    pub name: String,
    pub extension: String,
    pub length: u32,
}

impl IndexNode {
    const OFFSET_ID: usize = 0;
    const OFFSET_DELETED: usize = 16;
    const OFFSET_RIGHT: usize = 17;
    const OFFSET_LEFT: usize = 22;
    const OFFSET_DATA_PAGE: usize = 27;
    const OFFSET_NAME: usize = 31;
    const OFFSET_EXTENSION: usize = Self::OFFSET_NAME + NAME_FIELD_SIZE;
    const OFFSET_LENGTH: usize = Self::OFFSET_EXTENSION + EXTENSION_FIELD_SIZE;

    /// A fresh node: no children, no data, flagged deleted until its blob
    /// has been written.
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            deleted: true,
            right: None,
            left: None,
            data_page: None,
            name: String::new(),
            extension: String::new(),
            length: 0,
        }
    }

    /// The anchor node occupying slot 0 of page 0.
    pub fn sentinel() -> Self {
        Self::new(EntryId::ROOT)
    }

    #[inline]
    pub fn child(&self, side: Side) -> Option<IndexLink> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub fn set_child(&mut self, side: Side, link: IndexLink) {
        match side {
            Side::Left => self.left = Some(link),
            Side::Right => self.right = Some(link),
        }
    }

    /// Store a name and extension, truncated to their field widths.
    pub fn set_file_name(&mut self, name: &str, extension: &str) {
        self.name = codec::truncate_to_width(name, NAME_FIELD_SIZE).to_string();
        self.extension = codec::truncate_to_width(extension, EXTENSION_FIELD_SIZE).to_string();
    }

    fn decode(buf: &[u8]) -> Self {
        let mut id = [0u8; EntryId::SIZE];
        id.copy_from_slice(&buf[Self::OFFSET_ID..Self::OFFSET_ID + EntryId::SIZE]);

        Self {
            id: EntryId::from_disk_bytes(id),
            deleted: buf[Self::OFFSET_DELETED] != 0,
            right: IndexLink::decode(&buf[Self::OFFSET_RIGHT..]),
            left: IndexLink::decode(&buf[Self::OFFSET_LEFT..]),
            data_page: PageId::from_raw(codec::get_u32(buf, Self::OFFSET_DATA_PAGE)),
            name: codec::get_fixed_str(&buf[Self::OFFSET_NAME..Self::OFFSET_EXTENSION]),
            extension: codec::get_fixed_str(&buf[Self::OFFSET_EXTENSION..Self::OFFSET_LENGTH]),
            length: codec::get_u32(buf, Self::OFFSET_LENGTH),
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        buf[Self::OFFSET_ID..Self::OFFSET_ID + EntryId::SIZE].copy_from_slice(&self.id.to_disk_bytes());
        buf[Self::OFFSET_DELETED] = u8::from(self.deleted);
        IndexLink::encode(self.right, &mut buf[Self::OFFSET_RIGHT..]);
        IndexLink::encode(self.left, &mut buf[Self::OFFSET_LEFT..]);
        codec::put_u32(buf, Self::OFFSET_DATA_PAGE, PageId::to_raw(self.data_page));
        codec::put_fixed_str(
            &mut buf[Self::OFFSET_NAME..Self::OFFSET_EXTENSION],
            &self.name,
        );
        codec::put_fixed_str(
            &mut buf[Self::OFFSET_EXTENSION..Self::OFFSET_LENGTH],
            &self.extension,
        );
        codec::put_u32(buf, Self::OFFSET_LENGTH, self.length);
    }
}

// ============================================================================
// INDEX PAGE
// ============================================================================

/// A page of index nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    page_id: PageId,
    /// Next page in the index allocation chain.
    pub next_index_page: Option<PageId>,
    /// Highest slot in use. Slot 0 is always in use.
    highest_slot: u8,
    nodes: Vec<IndexNode>,
}

impl IndexPage {
    /// Offset of the highest-slot byte within the page.
    const OFFSET_HIGHEST_SLOT: usize = PageHeader::SIZE;

    /// A new page whose slot 0 holds `first`.
    pub fn new(page_id: PageId, first: IndexNode) -> Self {
        Self {
            page_id,
            next_index_page: None,
            highest_slot: 0,
            nodes: vec![first],
        }
    }

    /// A fresh root page holding only the sentinel.
    pub fn new_root() -> Self {
        Self::new(PageId::ROOT, IndexNode::sentinel())
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Highest slot index in use.
    #[inline]
    pub fn highest_slot(&self) -> u8 {
        self.highest_slot
    }

    /// Number of slots in use.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when no further slot can be reserved.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.nodes.len() >= NODES_PER_PAGE
    }

    /// Reserve the next unused slot, placing `node` in it.
    ///
    /// Hands the node back if the page is full.
    pub fn reserve_slot(&mut self, node: IndexNode) -> std::result::Result<u8, IndexNode> {
        if self.is_full() {
            return Err(node);
        }
        self.nodes.push(node);
        self.highest_slot = (self.nodes.len() - 1) as u8;
        Ok(self.highest_slot)
    }

    /// Node in `slot`, if that slot is in use.
    #[inline]
    pub fn node(&self, slot: u8) -> Option<&IndexNode> {
        self.nodes.get(slot as usize)
    }

    #[inline]
    pub fn node_mut(&mut self, slot: u8) -> Option<&mut IndexNode> {
        self.nodes.get_mut(slot as usize)
    }

    /// All used slots in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = &IndexNode> {
        self.nodes.iter()
    }

    /// Bytes occupied on disk by the header and the used slots.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        Self::encoded_len_for(self.highest_slot)
    }

    #[inline]
    pub(crate) fn encoded_len_for(highest_slot: u8) -> usize {
        INDEX_PAGE_HEADER_SIZE + (highest_slot as usize + 1) * INDEX_NODE_SIZE
    }

    /// Validate the fixed header region of an index page and return the
    /// highest slot it declares.
    pub(crate) fn parse_prefix(page_id: PageId, prefix: &[u8]) -> Result<u8> {
        let header = PageHeader::from_bytes(prefix);
        if header.page_type() != Some(PageType::Index) {
            return Err(Error::UnexpectedPageType {
                page_id,
                expected: PageType::Index,
                found: header.type_tag,
            });
        }
        let highest_slot = prefix[Self::OFFSET_HIGHEST_SLOT];
        if highest_slot as usize >= NODES_PER_PAGE {
            return Err(Error::invalid_format(format!(
                "{page_id} declares slot {highest_slot} in use"
            )));
        }
        Ok(highest_slot)
    }

    /// Decode a page from its header region plus used slots.
    ///
    /// `data` must hold at least [`IndexPage::encoded_len`] bytes.
    pub fn from_bytes(page_id: PageId, data: &[u8]) -> Result<Self> {
        let highest_slot = Self::parse_prefix(page_id, data)?;
        let header = PageHeader::from_bytes(data);

        let nodes = (0..=highest_slot as usize)
            .map(|slot| {
                let start = INDEX_PAGE_HEADER_SIZE + slot * INDEX_NODE_SIZE;
                IndexNode::decode(&data[start..start + INDEX_NODE_SIZE])
            })
            .collect();

        Ok(Self {
            page_id,
            next_index_page: header.next,
            highest_slot,
            nodes,
        })
    }

    /// Encode the header region plus used slots.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.encoded_len()];

        PageHeader::new(PageType::Index, self.next_index_page).write_to(&mut data);
        data[Self::OFFSET_HIGHEST_SLOT] = self.highest_slot;

        for (slot, node) in self.nodes.iter().enumerate() {
            let start = INDEX_PAGE_HEADER_SIZE + slot * INDEX_NODE_SIZE;
            node.encode(&mut data[start..start + INDEX_NODE_SIZE]);
        }
        data
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> IndexNode {
        let mut node = IndexNode::new(EntryId::generate());
        node.deleted = false;
        node.right = Some(IndexLink::new(PageId::new(3), 7));
        node.data_page = Some(PageId::new(12));
        node.set_file_name("report", "pdf");
        node.length = 123_456;
        node
    }

    #[test]
    fn test_node_byte_layout() {
        let node = sample_node();
        let mut buf = [0u8; INDEX_NODE_SIZE];
        node.encode(&mut buf);

        assert_eq!(buf[0..16], node.id.to_disk_bytes());
        assert_eq!(buf[16], 0);
        // right link: slot then page id
        assert_eq!(&buf[17..22], &[7, 3, 0, 0, 0]);
        // left link absent
        assert_eq!(&buf[22..27], &[0, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&buf[27..31], &12u32.to_le_bytes());
        assert_eq!(&buf[31..37], b"report");
        assert_eq!(&buf[72..75], b"pdf");
        assert_eq!(&buf[77..81], &123_456u32.to_le_bytes());

        assert_eq!(IndexNode::decode(&buf), node);
    }

    #[test]
    fn test_new_node_is_deleted() {
        let node = IndexNode::new(EntryId::generate());
        assert!(node.deleted);
        assert_eq!(node.left, None);
        assert_eq!(node.right, None);
        assert_eq!(node.data_page, None);
    }

    #[test]
    fn test_set_file_name_truncates() {
        let mut node = IndexNode::sentinel();
        node.set_file_name(&"n".repeat(60), "backup");
        assert_eq!(node.name.len(), NAME_FIELD_SIZE);
        assert_eq!(node.extension, "backu");
    }

    #[test]
    fn test_root_page_encoding() {
        let page = IndexPage::new_root();
        let bytes = page.to_bytes();

        assert_eq!(bytes.len(), INDEX_PAGE_HEADER_SIZE + INDEX_NODE_SIZE);
        assert_eq!(bytes[0], PageType::Index as u8);
        assert_eq!(&bytes[1..5], &[0xFF; 4]);
        assert_eq!(bytes[5], 0);

        let decoded = IndexPage::from_bytes(PageId::ROOT, &bytes).unwrap();
        assert_eq!(decoded, page);
        assert_eq!(decoded.node(0).unwrap().id, EntryId::ROOT);
        assert!(decoded.node(0).unwrap().deleted);
    }

    #[test]
    fn test_reserve_until_full() {
        let mut page = IndexPage::new_root();
        for expected in 1..NODES_PER_PAGE as u8 {
            assert_eq!(page.reserve_slot(sample_node()), Ok(expected));
        }
        assert!(page.is_full());
        assert_eq!(page.highest_slot(), 49);
        assert!(page.reserve_slot(sample_node()).is_err());
        assert_eq!(page.encoded_len(), 4096);

        page.next_index_page = Some(PageId::new(9));
        let decoded = IndexPage::from_bytes(PageId::ROOT, &page.to_bytes()).unwrap();
        assert_eq!(decoded, page);
    }

    #[test]
    fn test_wrong_type_tag() {
        let mut bytes = IndexPage::new_root().to_bytes();
        bytes[0] = PageType::Data as u8;

        let err = IndexPage::from_bytes(PageId::new(4), &bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedPageType {
                expected: PageType::Index,
                found: 1,
                ..
            }
        ));
    }
}
