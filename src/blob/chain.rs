//! Chained blob I/O.
//!
//! A blob is stored as a singly linked chain of data pages, each holding up
//! to [`DATA_PER_PAGE`] bytes:
//!
//! ```text
//! node.data_page ──▶ [4088 B] ──▶ [4088 B] ──▶ [1234 B] ──▶ ∅
//! ```
//!
//! The writer fills every page completely before moving on, so a blob of
//! `L > 0` bytes occupies exactly `ceil(L / 4088)` pages. An empty blob
//! occupies one non-empty page with a zero-length payload.

use std::io::{self, Read, Write};

use crate::common::config::DATA_PER_PAGE;
use crate::common::{Error, PageId, Result};
use crate::freelist::Allocator;
use crate::storage::page::{DataPage, DataRead};
use crate::storage::PageStore;

/// Largest blob the 4-byte length field can describe.
pub const MAX_BLOB_LENGTH: u64 = u32::MAX as u64;

/// Outcome of a successful chain write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainWrite {
    /// First page of the chain.
    pub first: PageId,
    /// Total bytes written.
    pub length: u32,
}

/// Write everything `input` yields as a new chain.
///
/// If the input fails or exceeds `max_length`, the pages written so far are
/// returned to the free list before the error is reported. A page expected
/// empty that holds data is a consistency error and nothing is cleaned up.
pub fn write_chain<R: Read + ?Sized>(
    alloc: &mut Allocator<'_>,
    input: &mut R,
    max_length: u64,
) -> Result<ChainWrite> {
    let mut chunk = vec![0u8; DATA_PER_PAGE];
    let mut chunk_len = read_full(input, &mut chunk)?;

    let first = alloc.start_data_page_id()?;
    let mut page = alloc.load_for_write(first)?;
    let mut total = 0u64;

    let outcome = loop {
        if !page.is_empty() {
            return Err(Error::PageNotEmpty {
                page_id: page.page_id(),
            });
        }
        page.fill(&chunk[..chunk_len]);
        total += chunk_len as u64;

        if total > max_length {
            break Err(Error::BlobTooLarge { length: total });
        }
        if chunk_len < DATA_PER_PAGE {
            break Ok(());
        }
        chunk_len = match read_full(input, &mut chunk) {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            Err(e) => break Err(e),
        };
        page = alloc.next_data_page(&mut page)?;
    };

    finish_chain(alloc, page)?;

    match outcome {
        Ok(()) => Ok(ChainWrite {
            first,
            // Bounded by `max_length`, itself at most u32::MAX.
            length: total.min(MAX_BLOB_LENGTH) as u32,
        }),
        Err(err) => {
            alloc.reclaim_chain(first)?;
            Err(err)
        }
    }
}

/// Terminate the chain at `last` and write it.
///
/// A page taken from the free list may still link to the rest of the free
/// list; that link is cut and the remainder stays (or is put back) on the
/// free list.
fn finish_chain(alloc: &mut Allocator<'_>, mut last: DataPage) -> Result<()> {
    let remainder = last.next.take();
    alloc.write_data_page(&last)?;

    if let Some(rest) = remainder {
        alloc.release_remainder(rest)?;
    }
    Ok(())
}

/// Copy the chain starting at `first` into `output`.
///
/// `max_pages` bounds the walk so a corrupted, cyclic chain fails instead
/// of looping forever. Returns the number of bytes copied.
pub fn read_chain<W: Write + ?Sized>(
    store: &PageStore,
    first: PageId,
    max_pages: u64,
    output: &mut W,
) -> Result<u64> {
    let mut walker = ChainWalker::new(store, first, max_pages);
    let mut copied = 0u64;

    while let Some(page) = walker.next_page()? {
        output.write_all(page.payload())?;
        copied += page.len() as u64;
    }
    Ok(copied)
}

/// Page-by-page iteration over a blob chain.
pub(crate) struct ChainWalker<'a> {
    store: &'a PageStore,
    next: Option<PageId>,
    budget: u64,
}

impl<'a> ChainWalker<'a> {
    pub(crate) fn new(store: &'a PageStore, first: PageId, max_pages: u64) -> Self {
        Self {
            store,
            next: Some(first),
            budget: max_pages,
        }
    }

    /// Load the next page with its payload, or `None` at the end.
    pub(crate) fn next_page(&mut self) -> Result<Option<DataPage>> {
        let Some(page_id) = self.next else {
            return Ok(None);
        };
        if self.budget == 0 {
            return Err(Error::FreeListCorrupted {
                page_id,
                reason: "blob chain is longer than the file".into(),
            });
        }
        self.budget -= 1;

        let page = self.store.read_data_page(page_id, DataRead::Full)?;
        if page.is_empty() {
            return Err(Error::FreeListCorrupted {
                page_id,
                reason: "blob chain runs into a free page".into(),
            });
        }
        self.next = page.next;
        Ok(Some(page))
    }
}

/// Fill `buf` from `input`, stopping early only at end of input.
fn read_full<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

// ============================================================================
// TESTS
// ============================================================================
