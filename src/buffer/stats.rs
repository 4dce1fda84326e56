//! Index page cache statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the index page cache.
///
/// All fields are atomic so they can be read through a shared reference
/// while the engine is borrowed elsewhere. `Ordering::Relaxed` is enough:
/// counters are independent and only need atomicity.
///
/// # Example
/// ```
/// use blobfile::CacheStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = CacheStats::new();
/// stats.hits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().hits, 1);
/// ```
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: AtomicU64,

    /// Lookups that had to read the page from disk.
    pub misses: AtomicU64,

    /// Pages dropped to make room.
    pub evictions: AtomicU64,

    /// Index pages read from disk.
    pub pages_loaded: AtomicU64,

    /// Dirty index pages written back (flush or eviction).
    pub pages_flushed: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a non-atomic copy for display and comparison.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pages_loaded: self.pages_loaded.load(Ordering::Relaxed),
            pages_flushed: self.pages_flushed.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.evictions,
            &self.pages_loaded,
            &self.pages_flushed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub pages_loaded: u64,
    pub pages_flushed: u64,
}

impl CacheStatsSnapshot {
    /// Cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IndexCache {{ hits: {}, misses: {}, evictions: {}, flushed: {}, hit_rate: {:.2}% }}",
            self.hits,
            self.misses,
            self.evictions,
            self.pages_flushed,
            self.hit_rate() * 100.0
        )
    }
}
