use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::{AccessType, FrameId, Timestamp};

/// Per-frame access history, bounded at k entries (oldest at the front).
#[derive(Debug, Default)]
struct LruKNode {
    history: VecDeque<Timestamp>,
    is_evictable: bool,
}

impl LruKNode {
    /// Backward k-distance at `now`, or None when the frame has fewer
    /// than k recorded accesses (treated as +inf by the policy).
    fn k_distance(&self, now: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            // With the history bounded at k, the front entry is the
            // k-th most recent access.
            Some(now - self.history.front().copied().unwrap())
        }
    }

    fn latest_access(&self) -> Option<Timestamp> {
        self.history.back().copied()
    }
}

struct ReplacerInner {
    node_store: HashMap<FrameId, LruKNode>,
    current_timestamp: Timestamp,
    /// Number of evictable frames
    curr_size: usize,
}

/// LRU-K replacement policy.
///
/// Evicts the frame with the largest backward k-distance: the difference
/// between the current timestamp and the timestamp of the k-th most
/// recent access. A frame with fewer than k recorded accesses has +inf
/// distance; among those, the frame whose most recent access lies
/// furthest in the past wins (a frame with no history at all wins
/// outright). Scan accesses are tracked but never recorded in the
/// history.
pub struct LruKReplacer {
    k: usize,
    num_frames: usize,
    inner: Mutex<ReplacerInner>,
}

impl LruKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0, "LRU-K requires k >= 1");
        Self {
            k,
            num_frames,
            inner: Mutex::new(ReplacerInner {
                node_store: HashMap::new(),
                current_timestamp: 0,
                curr_size: 0,
            }),
        }
    }

    /// Selects and removes the victim frame, or None when nothing is
    /// evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        let now = inner.current_timestamp;

        let mut victim: Option<FrameId> = None;
        // (has +inf distance, preference key) of the current best choice.
        let mut victim_inf = false;
        let mut victim_k_dist: Timestamp = 0;
        let mut victim_latest: Option<Timestamp> = None;

        for (&frame_id, node) in inner.node_store.iter() {
            if !node.is_evictable {
                continue;
            }

            match node.k_distance(now, self.k) {
                None => {
                    // +inf distance: prefer the oldest latest-access.
                    // None (no history at all) sorts below every Some.
                    let latest = node.latest_access();
                    if !victim_inf || victim.is_none() || latest < victim_latest {
                        victim = Some(frame_id);
                        victim_inf = true;
                        victim_latest = latest;
                    }
                }
                Some(k_dist) => {
                    if victim_inf {
                        continue;
                    }
                    if victim.is_none() || k_dist > victim_k_dist {
                        victim = Some(frame_id);
                        victim_k_dist = k_dist;
                    }
                }
            }
        }

        if let Some(frame_id) = victim {
            log::trace!("lru-k evicting frame {}", frame_id);
            inner.node_store.remove(&frame_id);
            inner.curr_size -= 1;
        }

        victim
    }

    /// Records an access to the given frame at the current timestamp.
    /// Scan accesses create the tracking node but leave the history (and
    /// the clock) untouched.
    pub fn record_access(&self, frame_id: FrameId, access_type: AccessType) {
        assert!(
            frame_id.as_usize() < self.num_frames,
            "frame id {} out of range for replacer of {} frames",
            frame_id,
            self.num_frames
        );

        let mut inner = self.inner.lock();
        let timestamp = inner.current_timestamp;
        let k = self.k;

        let node = inner.node_store.entry(frame_id).or_default();
        if access_type != AccessType::Scan {
            if node.history.len() == k {
                node.history.pop_front();
            }
            node.history.push_back(timestamp);
            inner.current_timestamp += 1;
        }
    }

    /// Toggles a frame's evictability; the evictable count moves only on
    /// an actual state change. Unknown frames are registered first.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        assert!(
            frame_id.as_usize() < self.num_frames,
            "frame id {} out of range for replacer of {} frames",
            frame_id,
            self.num_frames
        );

        let mut inner = self.inner.lock();
        let node = inner.node_store.entry(frame_id).or_default();
        if node.is_evictable != evictable {
            node.is_evictable = evictable;
            if evictable {
                inner.curr_size += 1;
            } else {
                inner.curr_size -= 1;
            }
        }
    }

    /// Drops a frame's history entirely. No-op for untracked frames;
    /// panics if the frame is tracked but currently pinned.
    pub fn remove(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if let Some(node) = inner.node_store.get(&frame_id) {
            assert!(
                node.is_evictable,
                "remove() called on non-evictable frame {}",
                frame_id
            );
            inner.node_store.remove(&frame_id);
            inner.curr_size -= 1;
        }
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.inner.lock().curr_size
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evict_empty() {
        let replacer = LruKReplacer::new(10, 2);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_inf_distance_beats_finite() {
        let replacer = LruKReplacer::new(10, 2);

        // Frame 0: two accesses (finite distance). Frame 1: one access.
        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.record_access(FrameId::new(1), AccessType::Unknown);

        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_inf_tie_break_on_latest_access() {
        let replacer = LruKReplacer::new(10, 3);

        // All below k=3 accesses. Latest accesses: frame 0 at t=2,
        // frame 1 at t=1, frame 2 at t=3.
        replacer.record_access(FrameId::new(0), AccessType::Unknown); // t=0
        replacer.record_access(FrameId::new(1), AccessType::Unknown); // t=1
        replacer.record_access(FrameId::new(0), AccessType::Unknown); // t=2
        replacer.record_access(FrameId::new(2), AccessType::Unknown); // t=3

        for i in 0..3 {
            replacer.set_evictable(FrameId::new(i), true);
        }

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    }

    #[test]
    fn test_largest_k_distance_wins() {
        let replacer = LruKReplacer::new(10, 2);

        for frame in 0..3u32 {
            replacer.record_access(FrameId::new(frame), AccessType::Unknown);
            replacer.record_access(FrameId::new(frame), AccessType::Unknown);
            replacer.set_evictable(FrameId::new(frame), true);
        }

        // Oldest second-to-last access is frame 0's.
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    }

    #[test]
    fn test_scan_access_ignored_by_history() {
        let replacer = LruKReplacer::new(10, 2);

        // Frame 0 gets two real accesses, frame 1 one real access plus
        // many scans. Frame 1 keeps +inf distance and is evicted first.
        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.record_access(FrameId::new(1), AccessType::Lookup);
        for _ in 0..5 {
            replacer.record_access(FrameId::new(1), AccessType::Scan);
        }

        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_set_evictable_counts_state_changes_only() {
        let replacer = LruKReplacer::new(10, 2);

        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.size(), 1);

        replacer.set_evictable(FrameId::new(0), false);
        replacer.set_evictable(FrameId::new(0), false);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_remove_untracked_is_noop() {
        let replacer = LruKReplacer::new(10, 2);
        replacer.remove(FrameId::new(5));
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    #[should_panic(expected = "non-evictable")]
    fn test_remove_pinned_frame_panics() {
        let replacer = LruKReplacer::new(10, 2);
        replacer.record_access(FrameId::new(0), AccessType::Unknown);
        replacer.remove(FrameId::new(0));
    }

    #[test]
    fn test_history_bounded_at_k() {
        let replacer = LruKReplacer::new(10, 2);

        for _ in 0..10 {
            replacer.record_access(FrameId::new(0), AccessType::Unknown);
        }
        replacer.record_access(FrameId::new(1), AccessType::Unknown);
        replacer.record_access(FrameId::new(1), AccessType::Unknown);

        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        // Frame 0's history is trimmed to its last two accesses (t=8,
        // t=9), still older than frame 1's (t=10, t=11), so frame 0 has
        // the larger k-distance.
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }
}
