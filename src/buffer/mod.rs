//! Index page caching.
//!
//! Index pages are visited on every tree descent, so they are cached in
//! memory and written back in one pass on persist. Data pages are never
//! cached.
//!
//! # Components
//! - [`IndexCache`] - The bounded page cache
//! - [`CacheStats`] - Hit/miss/eviction counters
//! - FIFO eviction with the root page pinned

mod frame;
mod index_cache;
mod replacer;
mod stats;

pub use index_cache::IndexCache;
pub use stats::{CacheStats, CacheStatsSnapshot};
