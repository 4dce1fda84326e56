//! Error types for blobfile.

use thiserror::Error;

use crate::common::{EntryId, PageId};
use crate::storage::page::PageType;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in blobfile.
///
/// Variants fall into four classes:
/// - I/O: passed through unmodified from the operating system.
/// - Format: the file is not a store of this version, or a page does not
///   carry the expected type tag ([`Error::is_format`]).
/// - Lock timeout: another writer holds the file.
/// - Consistency: an engine or allocator invariant was broken
///   ([`Error::is_consistency`]). The session should be abandoned.
///
/// An absent identifier is never an error; lookups return `None`/`false`.
#[derive(Debug, Error)]
pub enum Error {
    // ------------------------------------------------------------------------
    // I/O
    // ------------------------------------------------------------------------
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ------------------------------------------------------------------------
    // Format
    // ------------------------------------------------------------------------
    /// The header region is not a valid store header.
    #[error("invalid store file: {reason}")]
    InvalidFormat { reason: String },

    /// The header carries a format version this build cannot read.
    #[error("unsupported file format version {found}")]
    UnsupportedVersion { found: u16 },

    /// A page was read as one kind but its type tag says otherwise.
    #[error("{page_id} is not a {expected:?} page (type tag {found})")]
    UnexpectedPageType {
        page_id: PageId,
        expected: PageType,
        found: u8,
    },

    // ------------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------------
    /// The write lock could not be taken within the retry budget.
    #[error("store file is locked by another writer (gave up after {attempts} attempts)")]
    LockTimeout { attempts: u32 },

    // ------------------------------------------------------------------------
    // Consistency
    // ------------------------------------------------------------------------
    /// A data page handed out for writing already holds data.
    #[error("{page_id} was expected to be empty")]
    PageNotEmpty { page_id: PageId },

    /// The free data page list is damaged.
    #[error("free list corrupted at {page_id}: {reason}")]
    FreeListCorrupted { page_id: PageId, reason: String },

    /// The identifier is already present in the index.
    #[error("identifier {0} already exists")]
    DuplicateId(EntryId),

    // ------------------------------------------------------------------------
    // Usage
    // ------------------------------------------------------------------------
    /// The blob does not fit the 4-byte length field.
    #[error("blob exceeds maximum length ({length} bytes read)")]
    BlobTooLarge { length: u64 },

    /// A mutating call was made on a store opened read-only.
    #[error("store is opened read-only")]
    ReadOnly,

    /// The database handle no longer owns an open engine.
    #[error("database is closed")]
    Closed,
}

impl Error {
    /// True if the file is not a store, or a page has the wrong type.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat { .. }
                | Error::UnsupportedVersion { .. }
                | Error::UnexpectedPageType { .. }
        )
    }

    /// True if an engine invariant was violated.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            Error::PageNotEmpty { .. } | Error::FreeListCorrupted { .. } | Error::DuplicateId(_)
        )
    }

    pub(crate) fn invalid_format(reason: impl Into<String>) -> Self {
        Error::InvalidFormat {
            reason: reason.into(),
        }
    }
}
