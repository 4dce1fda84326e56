//! Page types and layout.
//!
//! This module contains:
//! - [`PageHeader`] - The tag and forward pointer at the start of every page
//! - [`PageType`] - Discriminator for the two page formats
//! - [`IndexPage`] - Identifier index nodes
//! - [`DataPage`] - One page of a blob chain

mod data_page;
mod index_page;
mod page_header;

pub use data_page::{DataPage, DataRead};
pub use index_page::{IndexLink, IndexNode, IndexPage, Side};
pub use page_header::{PageHeader, PageType};
