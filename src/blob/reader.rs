//! Streaming access to a stored blob.

use std::io::{self, Read};

use crate::blob::chain::ChainWalker;
use crate::common::{Error, PageId};
use crate::storage::PageStore;

/// Reads one blob page by page.
///
/// Borrows the engine's page store, so the engine cannot be used (or
/// closed) while the reader is alive. Only one page payload is held in
/// memory at a time.
///
/// Store errors surface as `io::Error`: I/O failures unchanged, format and
/// consistency errors as `ErrorKind::InvalidData` wrapping the
/// [`Error`].
pub struct BlobReader<'a> {
    walker: ChainWalker<'a>,
    buffer: Vec<u8>,
    pos: usize,
    length: u64,
}

impl<'a> BlobReader<'a> {
    pub(crate) fn new(store: &'a PageStore, first: PageId, length: u64, max_pages: u64) -> Self {
        Self {
            walker: ChainWalker::new(store, first, max_pages),
            buffer: Vec::new(),
            pos: 0,
            length,
        }
    }

    /// Total length of the blob, as recorded in its index node.
    #[inline]
    pub fn len(&self) -> u64 {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Read for BlobReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.buffer.len() {
            match self.walker.next_page().map_err(into_io)? {
                Some(page) => {
                    self.buffer.clear();
                    self.buffer.extend_from_slice(page.payload());
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }

        let n = buf.len().min(self.buffer.len() - self.pos);
        buf[..n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn into_io(err: Error) -> io::Error {
    match err {
        Error::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::chain::{write_chain, MAX_BLOB_LENGTH};
    use crate::common::config::DATA_PER_PAGE;
    use crate::common::{AccessMode, StoreConfig};
    use crate::freelist::Allocator;
    use tempfile::tempdir;

    #[test]
    fn test_streams_across_pages() {
        let dir = tempdir().unwrap();
        let store = PageStore::open(
            dir.path().join("reader.db"),
            AccessMode::ReadWrite,
            &StoreConfig::default(),
        )
        .unwrap();
        let mut header = store.read_header().unwrap();

        let data: Vec<u8> = (0..DATA_PER_PAGE * 2 + 17).map(|i| (i % 7) as u8).collect();
        let written = write_chain(
            &mut Allocator::new(&mut header, &store),
            &mut data.as_slice(),
            MAX_BLOB_LENGTH,
        )
        .unwrap();

        let mut reader = BlobReader::new(&store, written.first, data.len() as u64, 10);
        assert_eq!(reader.len(), data.len() as u64);

        // Small reads cross page boundaries.
        let mut out = Vec::new();
        let mut small = [0u8; 1000];
        loop {
            let n = reader.read(&mut small).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&small[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_corruption_is_invalid_data() {
        let dir = tempdir().unwrap();
        let store = PageStore::open(
            dir.path().join("reader.db"),
            AccessMode::ReadWrite,
            &StoreConfig::default(),
        )
        .unwrap();

        // Page 0 is an index page, not a data page.
        let mut reader = BlobReader::new(&store, PageId::ROOT, 1, 10);
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
