//! blobfile - many blobs in one paged file.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            blobfile                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Facade (database/)  +  CLI (bin/blobfile)         │   │
//! │  │      store_file / read_to_file / export / shrink         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                   Engine (engine.rs)                     │   │
//! │  │   insert / read / open_read / search / delete / list     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │              ↓                                 ↓                │
//! │  ┌──────────────────────────┐   ┌──────────────────────────┐   │
//! │  │   Index (index/)         │   │   Blob chains (blob/)    │   │
//! │  │   unbalanced BST over    │   │   linked data pages,     │   │
//! │  │   (page, slot) links     │   │   4088 B payload each    │   │
//! │  └──────────────────────────┘   └──────────────────────────┘   │
//! │              ↓                                 ↓                │
//! │  ┌──────────────────────────┐   ┌──────────────────────────┐   │
//! │  │  Index cache (buffer/)   │   │  Allocator (freelist/)   │   │
//! │  │  FIFO, root pinned       │   │  free data page list     │   │
//! │  └──────────────────────────┘   └──────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Storage Layer (storage/)                  │   │
//! │  │     PageStore + Header + page codecs + write lock        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # File layout
//! ```text
//! 0           100          100 + 4096        100 + 2·4096
//! ┌───────────┬────────────┬─────────────────┬──────────────
//! │  Header   │   Page 0   │     Page 1      │   Page 2 ...
//! │  "FileDB" │ root index │  index or data  │
//! └───────────┴────────────┴─────────────────┴──────────────
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, EntryId, Error, config)
//! - [`storage`] - Page formats, header and file I/O
//! - [`buffer`] - Index page cache and its statistics
//! - [`freelist`] - Page allocation and reclamation
//! - [`index`] - Identifier index
//! - [`blob`] - Chained blob I/O
//! - [`engine`] - One open blob file
//! - [`database`] - Path-oriented facade
//! - [`debug`] - Page dump
//!
//! # Quick Start
//! ```no_run
//! use blobfile::{AccessMode, Engine};
//!
//! let mut engine = Engine::open("my_blobs.db", AccessMode::ReadWrite)?;
//! let entry = engine.insert("greeting.txt", &mut "hello".as_bytes())?;
//!
//! for entry in engine.list()? {
//!     println!("{entry}");
//! }
//! engine.delete(&entry.id())?;
//! engine.close()?;
//! # Ok::<(), blobfile::Error>(())
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod blob;
pub mod buffer;
pub mod common;
pub mod database;
pub mod debug;
pub mod engine;
pub mod entry;
pub mod freelist;
pub mod index;
pub mod storage;

// ============================================================================
// Public API Re-exports
// ============================================================================

pub use common::config::{DATA_PER_PAGE, PAGE_SIZE};
pub use common::{AccessMode, EntryId, Error, PageId, Result, StoreConfig, StoreConfigBuilder};

pub use blob::BlobReader;
pub use buffer::{CacheStats, CacheStatsSnapshot};
pub use database::BlobDatabase;
pub use engine::Engine;
pub use entry::Entry;
pub use storage::Header;

// ============================================================================
// Version Info
// ============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
