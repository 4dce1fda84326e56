//! FIFO (First-In-First-Out) replacement policy.
//!
//! The index page cache evicts the oldest loaded page that is not pinned.
//! Re-accessing a page does not move it.

use std::collections::{HashSet, VecDeque};

use crate::buffer::frame::FrameId;

/// A simple FIFO eviction policy.
///
/// Evicts frames in the order their pages were loaded. Pinned frames keep
/// their queue position and are skipped.
#[derive(Debug, Default)]
pub struct FifoReplacer {
    /// Queue of frame IDs in load order (front = oldest).
    queue: VecDeque<FrameId>,

    /// Frames that may not be evicted.
    pinned: HashSet<FrameId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a frame was (re)loaded with a page.
    ///
    /// Only adds to the queue if not already present.
    pub fn record_load(&mut self, frame_id: FrameId) {
        if !self.queue.contains(&frame_id) {
            self.queue.push_back(frame_id);
        }
    }

    /// Pin or unpin a frame.
    pub fn set_pinned(&mut self, frame_id: FrameId, pinned: bool) {
        if pinned {
            self.pinned.insert(frame_id);
        } else {
            self.pinned.remove(&frame_id);
        }
    }

    /// Select a victim frame for eviction.
    ///
    /// Returns the oldest unpinned frame, or None if every frame is pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        let position = self
            .queue
            .iter()
            .position(|frame_id| !self.pinned.contains(frame_id))?;
        self.queue.remove(position)
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.queue
            .iter()
            .filter(|frame_id| !self.pinned.contains(frame_id))
            .count()
    }
}
