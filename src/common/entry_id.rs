//! Entry identifier type.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Identifies a stored blob.
///
/// A random (v4) UUID. On disk it takes the mixed-endian GUID layout: the
/// first three fields little-endian, the last eight bytes as-is.
///
/// Ids order by fields, not by raw bytes: the 32-bit first field, then
/// the two 16-bit fields, then the trailing bytes in sequence. Files written
/// by other FileDB implementations shape their trees by this ordering.
///
/// # Example
/// ```
/// use blobfile::EntryId;
///
/// let a = EntryId::generate();
/// let b: EntryId = a.to_string().parse().unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Width of an identifier on disk.
    pub const SIZE: usize = 16;

    /// Key of the sentinel node anchoring the tree (slot 0 of page 0).
    ///
    /// Sits in the middle of the key space so random ids split evenly
    /// between its two subtrees.
    pub const ROOT: EntryId = EntryId(Uuid::from_bytes([0x7F; 16]));

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        EntryId(Uuid::new_v4())
    }

    /// Decode the on-disk (GUID) byte layout.
    #[inline]
    pub fn from_disk_bytes(bytes: [u8; Self::SIZE]) -> Self {
        EntryId(Uuid::from_bytes_le(bytes))
    }

    /// Encode to the on-disk (GUID) byte layout.
    #[inline]
    pub fn to_disk_bytes(&self) -> [u8; Self::SIZE] {
        self.0.to_bytes_le()
    }

    #[inline]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Ord for EntryId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_fields().cmp(&other.0.as_fields())
    }
}

impl PartialOrd for EntryId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Uuid> for EntryId {
    fn from(uuid: Uuid) -> Self {
        EntryId(uuid)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(EntryId)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}
