//! Frame - a slot in the index page cache.

use std::fmt;

use crate::storage::page::IndexPage;

/// Identifies a frame in the cache.
///
/// Frames live in a `Vec<Frame>`, so the id is a direct index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// A loaded index page plus its write-back state.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) page: IndexPage,
    /// Modified since it was loaded or last flushed.
    pub(crate) dirty: bool,
}

impl Frame {
    pub(crate) fn new(page: IndexPage, dirty: bool) -> Self {
        Self { page, dirty }
    }
}
