//! Page dump for inspecting a blob file by hand.
//!
//! ```text
//! [0] >> [2] (I) Nodes: 50
//! [1] >> [3] (D) Bytes: 4088
//! [2] >> [-] (I) Nodes: 7
//! [3] >> [-] (D) Bytes: 120
//! [4] >> [-] (D) Empty
//! ```

use crate::common::config::{
    DATA_PER_PAGE, FILE_VERSION, HEADER_SIZE, INDEX_NODE_SIZE, NODES_PER_PAGE, PAGE_SIZE,
};
use crate::common::{PageId, Result};
use crate::storage::page::{DataRead, PageType};
use crate::storage::{Header, PageStore};

/// Render the format constants, the header and one line per page.
///
/// Reads pages straight from disk; callers persist first so cached index
/// pages are included.
pub fn render_pages(store: &PageStore, header: &Header) -> Result<String> {
    let mut lines = vec![
        format!("File: {}", store.path().display()),
        format!(
            "Format: v{FILE_VERSION}, header {HEADER_SIZE} B, page {PAGE_SIZE} B, \
             {NODES_PER_PAGE} nodes x {INDEX_NODE_SIZE} B, {DATA_PER_PAGE} B data"
        ),
        format!("Root index page: {}", header.root_index_page().0),
        format!("Free index page: {}", header.free_index_page().0),
        format!("Free data head: {}", show(header.free_data_head())),
        format!("Free data tail: {}", show(header.free_data_tail())),
        format!("Last page: {}", header.last_page_id().0),
        String::new(),
    ];

    for raw in 0..=header.last_page_id().0 {
        lines.push(render_page(store, PageId::new(raw))?);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

fn render_page(store: &PageStore, page_id: PageId) -> Result<String> {
    let Some(page_header) = store.read_page_header(page_id)? else {
        return Ok(format!("[{}] (unwritten)", page_id.0));
    };
    let prefix = format!("[{}] >> [{}]", page_id.0, show(page_header.next));

    let line = match page_header.page_type() {
        Some(PageType::Index) => {
            let page = store.read_index_page(page_id)?;
            format!("{prefix} (I) Nodes: {}", page.node_count())
        }
        Some(PageType::Data) => {
            let page = store.read_data_page(page_id, DataRead::HeaderOnly)?;
            if page.is_empty() {
                format!("{prefix} (D) Empty")
            } else {
                format!("{prefix} (D) Bytes: {}", page.len())
            }
        }
        None => format!("{prefix} (?) tag {}", page_header.type_tag),
    };
    Ok(line)
}

fn show(page_id: Option<PageId>) -> String {
    match page_id {
        Some(id) => id.0.to_string(),
        None => "-".to_string(),
    }
}
