//! Integration tests for the LRU-K replacer

use rookdb::buffer::LruKReplacer;
use rookdb::common::{AccessType, FrameId};

#[test]
fn test_scenario_infinite_distance_victim() {
    // Pool of 3 logical frames, k = 2. Frames 0 and 1 are touched twice,
    // frame 2 once; frame 2 has infinite backward k-distance and loses.
    let replacer = LruKReplacer::new(3, 2);

    replacer.record_access(FrameId::new(0), AccessType::Lookup);
    replacer.record_access(FrameId::new(0), AccessType::Lookup);
    replacer.record_access(FrameId::new(1), AccessType::Lookup);
    replacer.record_access(FrameId::new(1), AccessType::Lookup);
    replacer.record_access(FrameId::new(2), AccessType::Lookup);

    assert_eq!(replacer.size(), 0);
    for i in 0..3 {
        replacer.set_evictable(FrameId::new(i), true);
    }
    assert_eq!(replacer.size(), 3);

    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    assert_eq!(replacer.size(), 2);
}

#[test]
fn test_eviction_order_all_single_access() {
    let replacer = LruKReplacer::new(10, 2);

    for i in 0..5 {
        replacer.record_access(FrameId::new(i), AccessType::Lookup);
        replacer.set_evictable(FrameId::new(i), true);
    }
    assert_eq!(replacer.size(), 5);

    // All have a single access (< k), so the oldest latest-access goes
    // first: plain FIFO here.
    for i in 0..5 {
        assert_eq!(replacer.evict(), Some(FrameId::new(i)));
    }
    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_finite_distance_ordering() {
    let replacer = LruKReplacer::new(10, 2);

    // Frame 0: t0, t1. Frame 1: t2, t3. Frame 2: t4, t5.
    for frame in 0..3u32 {
        replacer.record_access(FrameId::new(frame), AccessType::Lookup);
        replacer.record_access(FrameId::new(frame), AccessType::Lookup);
    }
    for frame in 0..3 {
        replacer.set_evictable(FrameId::new(frame), true);
    }

    // Largest distance to the 2nd most recent access wins.
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
}

#[test]
fn test_scan_accesses_do_not_build_history() {
    let replacer = LruKReplacer::new(10, 2);

    // Frame 0 gets two real accesses; frame 1 one real access buried in
    // scans. The scans must not promote frame 1 past frame 0.
    replacer.record_access(FrameId::new(0), AccessType::Lookup);
    replacer.record_access(FrameId::new(0), AccessType::Lookup);
    replacer.record_access(FrameId::new(1), AccessType::Lookup);
    for _ in 0..8 {
        replacer.record_access(FrameId::new(1), AccessType::Scan);
    }

    replacer.set_evictable(FrameId::new(0), true);
    replacer.set_evictable(FrameId::new(1), true);

    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
}

#[test]
fn test_non_evictable_frames_are_skipped() {
    let replacer = LruKReplacer::new(10, 2);

    for i in 0..3 {
        replacer.record_access(FrameId::new(i), AccessType::Lookup);
    }
    replacer.set_evictable(FrameId::new(1), true);
    replacer.set_evictable(FrameId::new(2), true);

    assert_eq!(replacer.size(), 2);
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_toggle_evictable_adjusts_size_once() {
    let replacer = LruKReplacer::new(10, 2);

    replacer.record_access(FrameId::new(0), AccessType::Lookup);
    replacer.set_evictable(FrameId::new(0), true);
    assert_eq!(replacer.size(), 1);

    replacer.set_evictable(FrameId::new(0), false);
    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);

    replacer.set_evictable(FrameId::new(0), true);
    assert_eq!(replacer.size(), 1);
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
}

#[test]
fn test_remove_clears_history() {
    let replacer = LruKReplacer::new(10, 2);

    replacer.record_access(FrameId::new(0), AccessType::Lookup);
    replacer.record_access(FrameId::new(1), AccessType::Lookup);
    replacer.set_evictable(FrameId::new(0), true);
    replacer.set_evictable(FrameId::new(1), true);

    replacer.remove(FrameId::new(0));
    assert_eq!(replacer.size(), 1);
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_concurrent_access() {
    use std::sync::Arc;
    use std::thread;

    let replacer = Arc::new(LruKReplacer::new(100, 2));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let replacer = Arc::clone(&replacer);
            thread::spawn(move || {
                for i in 0..25 {
                    let frame_id = FrameId::new((t * 25 + i) as u32);
                    replacer.record_access(frame_id, AccessType::Lookup);
                    replacer.set_evictable(frame_id, true);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(replacer.size(), 100);
    for _ in 0..100 {
        assert!(replacer.evict().is_some());
    }
    assert_eq!(replacer.size(), 0);
}
