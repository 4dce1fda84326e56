//! Blob storage as chains of data pages.
//!
//! - [`chain`] - Writing and reading whole chains
//! - [`BlobReader`] - `std::io::Read` over a stored blob

pub mod chain;
mod reader;

pub use reader::BlobReader;
