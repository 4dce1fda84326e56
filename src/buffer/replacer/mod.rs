//! Eviction policy for the index page cache.
//!
//! - [`FifoReplacer`] - oldest unpinned page first

mod fifo;

pub use fifo::FifoReplacer;
