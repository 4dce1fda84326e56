//! Entry metadata - the public view of a stored blob.

use std::fmt;
use std::path::Path;

use crate::common::EntryId;
use crate::storage::page::IndexNode;

/// Read-only description of a stored blob.
///
/// A projection of an index node. The name and extension are kept exactly
/// as the node stores them; names longer than the on-disk fields are
/// reported truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    id: EntryId,
    name: String,
    extension: String,
    file_name: String,
    length: u64,
    content_type: &'static str,
}

impl Entry {
    pub(crate) fn from_node(node: &IndexNode) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            extension: node.extension.clone(),
            file_name: format!("{}.{}", node.name, node.extension),
            length: node.length as u64,
            content_type: content_type_for(&node.extension),
        }
    }

    #[inline]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// `name.extension`. The dot is present even when the extension is
    /// empty.
    #[inline]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Stored name field.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored extension field, without the dot. Possibly empty.
    #[inline]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Blob length in bytes.
    #[inline]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// MIME type inferred from the extension.
    #[inline]
    pub fn content_type(&self) -> &'static str {
        self.content_type
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {:>12}  {:<24}  {}",
            self.id, self.length, self.content_type, self.file_name
        )
    }
}

/// Split a file name into stem and extension (without the dot).
///
/// Follows [`Path::file_stem`] / [`Path::extension`]: `"a.tar.gz"` splits
/// into `("a.tar", "gz")`, `".profile"` has no extension.
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    let path = Path::new(file_name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => match (stem.to_str(), ext.to_str()) {
            (Some(stem), Some(ext)) => (stem, ext),
            _ => (file_name, ""),
        },
        _ => (file_name, ""),
    }
}

/// MIME type for a file extension, `application/octet-stream` if unknown.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "txt" | "log" => "text/plain",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "text/xml",
        "md" => "text/markdown",
        "js" => "application/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_file_name() {
        assert_eq!(split_file_name("x.txt"), ("x", "txt"));
        assert_eq!(split_file_name("archive.tar.gz"), ("archive.tar", "gz"));
        assert_eq!(split_file_name("README"), ("README", ""));
        assert_eq!(split_file_name(".profile"), (".profile", ""));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type_for("PNG"), "image/png");
        assert_eq!(content_type_for("txt"), "text/plain");
        assert_eq!(content_type_for(""), "application/octet-stream");
        assert_eq!(content_type_for("weird"), "application/octet-stream");
    }

    #[test]
    fn test_entry_from_node() {
        let mut node = IndexNode::new(EntryId::generate());
        node.set_file_name("photo", "jpg");
        node.length = 42;

        let entry = Entry::from_node(&node);
        assert_eq!(entry.file_name(), "photo.jpg");
        assert_eq!(entry.name(), "photo");
        assert_eq!(entry.extension(), "jpg");
        assert_eq!(entry.length(), 42);
        assert_eq!(entry.content_type(), "image/jpeg");
    }

    #[test]
    fn test_entry_without_extension() {
        let mut node = IndexNode::new(EntryId::generate());
        node.set_file_name("Makefile", "");
        let entry = Entry::from_node(&node);
        assert_eq!(entry.file_name(), "Makefile.");
        assert_eq!(entry.name(), "Makefile");
        assert_eq!(entry.extension(), "");
    }

    #[test]
    fn test_entry_keeps_stored_parts() {
        // A dotted name field must not be re-split.
        let mut node = IndexNode::new(EntryId::generate());
        node.set_file_name("archive.tar", "");
        let entry = Entry::from_node(&node);
        assert_eq!(entry.name(), "archive.tar");
        assert_eq!(entry.extension(), "");
        assert_eq!(entry.file_name(), "archive.tar.");

        // Truncation can cut a name right after a dot.
        let mut node = IndexNode::new(EntryId::generate());
        node.set_file_name("v1.", "gz");
        let entry = Entry::from_node(&node);
        assert_eq!(entry.name(), "v1.");
        assert_eq!(entry.extension(), "gz");
    }

    #[test]
    fn test_entry_reports_truncated_name() {
        let mut node = IndexNode::new(EntryId::generate());
        node.set_file_name(&"n".repeat(80), "markdown");
        let entry = Entry::from_node(&node);
        assert_eq!(entry.name().len(), 41);
        assert_eq!(entry.extension(), "markd");
    }
}
