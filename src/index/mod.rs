//! Identifier index.
//!
//! Maps entry identifiers to the index nodes describing their blobs.

mod tree;

pub use tree::IndexTree;
