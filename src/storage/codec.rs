//! Little-endian field helpers shared by the page and header codecs.
//!
//! Every multi-byte integer in the file is little-endian. Text fields are
//! fixed-width UTF-8, zero-padded on the right.

/// Read a `u16` at `at`.
#[inline]
pub(crate) fn get_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

/// Read a `u32` at `at`.
#[inline]
pub(crate) fn get_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[inline]
pub(crate) fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Longest prefix of `s` that fits in `width` bytes without splitting a
/// character.
pub(crate) fn truncate_to_width(s: &str, width: usize) -> &str {
    if s.len() <= width {
        return s;
    }
    let mut end = width;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Write `s` into `field`, truncating and zero-padding to the field width.
pub(crate) fn put_fixed_str(field: &mut [u8], s: &str) {
    let text = truncate_to_width(s, field.len());
    field.fill(0);
    field[..text.len()].copy_from_slice(text.as_bytes());
}

/// Read a zero-padded text field.
pub(crate) fn get_fixed_str(field: &[u8]) -> String {
    let end = field
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    String::from_utf8_lossy(&field[..end]).into_owned()
}
