//! Page identifier type.

use std::fmt;

/// Identifies a page in the store file.
///
/// Page ids are assigned monotonically and never returned to the OS:
/// page `N` lives at file offset `HEADER_SIZE + N × PAGE_SIZE`.
///
/// # Example
/// ```
/// use blobfile::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// This is the on-disk encoding of "no page". In memory, absent
    /// page pointers are `Option<PageId>`.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// The root index page. Always page 0.
    pub const ROOT: PageId = PageId(0);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Decode a raw pointer field, mapping the sentinel to `None`.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        let id = PageId(raw);
        id.is_valid().then_some(id)
    }

    /// Encode an optional pointer field, mapping `None` to the sentinel.
    #[inline]
    pub fn to_raw(id: Option<Self>) -> u32 {
        id.unwrap_or(Self::INVALID).0
    }

    /// The page id following this one.
    #[inline]
    pub fn next(self) -> Self {
        PageId(self.0 + 1)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_new() {
        let pid = PageId::new(42);
        assert_eq!(pid.0, 42);
        assert!(pid.is_valid());
    }

    #[test]
    fn test_page_id_invalid() {
        assert!(!PageId::INVALID.is_valid());
        assert_eq!(PageId::INVALID.0, u32::MAX);
    }

    #[test]
    fn test_raw_sentinel_mapping() {
        assert_eq!(PageId::from_raw(u32::MAX), None);
        assert_eq!(PageId::from_raw(7), Some(PageId::new(7)));
        assert_eq!(PageId::to_raw(None), u32::MAX);
        assert_eq!(PageId::to_raw(Some(PageId::new(7))), 7);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
        assert_eq!(format!("{}", PageId::INVALID), "Page(INVALID)");
    }
}
