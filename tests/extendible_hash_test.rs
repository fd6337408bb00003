//! Integration tests for the disk-resident extendible hash table

use std::sync::Arc;

use rookdb::buffer::BufferPoolManager;
use rookdb::common::{PageId, RecordId, SlotId};
use rookdb::index::{
    ExtendibleHashTable, Fnv1aHasher, HashDirectoryPageRef, IdentityHasher, KeyHasher,
};
use rookdb::storage::disk::DiskManager;
use tempfile::NamedTempFile;

fn create_bpm(pool_size: usize) -> (Arc<BufferPoolManager>, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
    (Arc::new(BufferPoolManager::new(pool_size, 2, dm)), temp_file)
}

fn rid(key: u32) -> RecordId {
    RecordId::new(PageId::new(key), SlotId::new(0))
}

/// Reads the global depth of the table's single directory.
fn global_depth(bpm: &Arc<BufferPoolManager>, table: &ExtendibleHashTable) -> u32 {
    let directories = table.directory_page_ids().unwrap();
    assert_eq!(directories.len(), 1, "test tables use a single directory");
    let guard = bpm.fetch_page_read(directories[0]).unwrap();
    HashDirectoryPageRef::new(guard.data()).global_depth()
}

/// Bucket page id for a directory slot.
fn bucket_of_slot(bpm: &Arc<BufferPoolManager>, table: &ExtendibleHashTable, slot: u32) -> PageId {
    let directories = table.directory_page_ids().unwrap();
    let guard = bpm.fetch_page_read(directories[0]).unwrap();
    HashDirectoryPageRef::new(guard.data()).bucket_page_id(slot)
}

#[test]
fn test_insert_get_remove_round_trip() {
    let (bpm, _temp) = create_bpm(32);
    let table =
        ExtendibleHashTable::new(Arc::clone(&bpm), Box::new(Fnv1aHasher), 2, 4, 8).unwrap();

    for key in 0..16u32 {
        assert!(table.insert(key, rid(key)).unwrap());
    }
    table.verify_integrity().unwrap();

    for key in 0..16u32 {
        assert_eq!(table.get(key).unwrap(), Some(rid(key)));
    }
    assert_eq!(table.get(999).unwrap(), None);

    for key in 0..8u32 {
        assert!(table.remove(key).unwrap());
    }
    table.verify_integrity().unwrap();

    for key in 0..8u32 {
        assert_eq!(table.get(key).unwrap(), None);
    }
    for key in 8..16u32 {
        assert_eq!(table.get(key).unwrap(), Some(rid(key)));
    }
}

#[test]
fn test_duplicate_insert_rejected() {
    let (bpm, _temp) = create_bpm(16);
    let table =
        ExtendibleHashTable::new(Arc::clone(&bpm), Box::new(Fnv1aHasher), 0, 4, 8).unwrap();

    assert!(table.insert(7, rid(1)).unwrap());
    assert!(!table.insert(7, rid(2)).unwrap());
    // The original mapping wins.
    assert_eq!(table.get(7).unwrap(), Some(rid(1)));
}

#[test]
fn test_remove_absent_key_is_false() {
    let (bpm, _temp) = create_bpm(16);
    let table =
        ExtendibleHashTable::new(Arc::clone(&bpm), Box::new(Fnv1aHasher), 0, 4, 8).unwrap();

    assert!(!table.remove(3).unwrap());
    assert!(table.insert(3, rid(3)).unwrap());
    assert!(table.remove(3).unwrap());
    assert!(!table.remove(3).unwrap());
}

#[test]
fn test_split_grows_directory() {
    // bucket_max_size = 2, identity hashing: keys are their own hashes.
    let (bpm, _temp) = create_bpm(32);
    let table =
        ExtendibleHashTable::new(Arc::clone(&bpm), Box::new(IdentityHasher), 0, 9, 2).unwrap();

    // 0b00 and 0b10 share the depth-0 bucket.
    assert!(table.insert(0b00, rid(0)).unwrap());
    assert!(table.insert(0b10, rid(2)).unwrap());
    assert_eq!(global_depth(&bpm, &table), 0);

    // 0b01 overflows it; one split separates the low bit.
    assert!(table.insert(0b01, rid(1)).unwrap());
    assert_eq!(global_depth(&bpm, &table), 1);
    table.verify_integrity().unwrap();

    // 0b100 overflows the even bucket {00, 10}; the next split needs
    // bit 1 and doubles the directory to depth 2.
    assert!(table.insert(0b100, rid(4)).unwrap());
    assert_eq!(global_depth(&bpm, &table), 2);
    table.verify_integrity().unwrap();

    // Slots 0b00 and 0b10 now hold distinct buckets; slots 0b01 and
    // 0b11 still share the odd bucket at local depth 1.
    assert_ne!(bucket_of_slot(&bpm, &table, 0b00), bucket_of_slot(&bpm, &table, 0b10));
    assert_eq!(bucket_of_slot(&bpm, &table, 0b01), bucket_of_slot(&bpm, &table, 0b11));

    for key in [0b00u32, 0b01, 0b10, 0b100] {
        assert_eq!(table.get(key).unwrap(), Some(rid(key)));
    }
}

#[test]
fn test_remove_merges_and_shrinks_directory() {
    let (bpm, _temp) = create_bpm(32);
    let table =
        ExtendibleHashTable::new(Arc::clone(&bpm), Box::new(IdentityHasher), 0, 9, 2).unwrap();

    for key in [0b00u32, 0b10, 0b01, 0b100] {
        assert!(table.insert(key, rid(key)).unwrap());
    }
    assert_eq!(global_depth(&bpm, &table), 2);

    // Emptying the {0b10} bucket merges it with its split image and the
    // directory halves.
    assert!(table.remove(0b10).unwrap());
    assert_eq!(global_depth(&bpm, &table), 1);
    table.verify_integrity().unwrap();

    // Emptying the odd bucket merges everything back to one bucket.
    assert!(table.remove(0b01).unwrap());
    assert_eq!(global_depth(&bpm, &table), 0);
    table.verify_integrity().unwrap();

    assert_eq!(table.get(0b00).unwrap(), Some(rid(0b00)));
    assert_eq!(table.get(0b100).unwrap(), Some(rid(0b100)));

    assert!(table.remove(0b00).unwrap());
    assert!(table.remove(0b100).unwrap());
    assert_eq!(table.get(0b00).unwrap(), None);
}

#[test]
fn test_capacity_exhaustion_returns_false() {
    // One-entry buckets and a one-bit directory: at most two distinct
    // low-bit classes fit.
    let (bpm, _temp) = create_bpm(16);
    let table =
        ExtendibleHashTable::new(Arc::clone(&bpm), Box::new(IdentityHasher), 0, 1, 1).unwrap();

    assert!(table.insert(0, rid(0)).unwrap());
    assert!(table.insert(1, rid(1)).unwrap());

    // Both buckets full at local == global == max depth.
    assert!(!table.insert(2, rid(2)).unwrap());
    assert!(!table.insert(3, rid(3)).unwrap());

    assert_eq!(table.get(0).unwrap(), Some(rid(0)));
    assert_eq!(table.get(1).unwrap(), Some(rid(1)));
    table.verify_integrity().unwrap();
}

/// Every key hashes to the same value; splits cannot separate anything.
struct ConstantHasher;

impl KeyHasher for ConstantHasher {
    fn hash(&self, _bytes: &[u8]) -> u32 {
        7
    }
}

#[test]
fn test_identical_hash_split_loop_terminates() {
    let (bpm, _temp) = create_bpm(32);
    let table =
        ExtendibleHashTable::new(Arc::clone(&bpm), Box::new(ConstantHasher), 0, 3, 2).unwrap();

    assert!(table.insert(1, rid(1)).unwrap());
    assert!(table.insert(2, rid(2)).unwrap());

    // The third colliding key splits all the way to max depth and is
    // then rejected instead of looping forever.
    assert!(!table.insert(3, rid(3)).unwrap());

    assert_eq!(table.get(1).unwrap(), Some(rid(1)));
    assert_eq!(table.get(2).unwrap(), Some(rid(2)));
    assert_eq!(table.get(3).unwrap(), None);
    table.verify_integrity().unwrap();
}

#[test]
fn test_multiple_directories_through_header() {
    // A 1-bit header splits the key space on the hash's top bit.
    let (bpm, _temp) = create_bpm(32);
    let table =
        ExtendibleHashTable::new(Arc::clone(&bpm), Box::new(IdentityHasher), 1, 4, 4).unwrap();

    assert!(table.insert(1, rid(1)).unwrap());
    assert!(table.insert(0x8000_0001, rid(2)).unwrap());

    assert_eq!(table.directory_page_ids().unwrap().len(), 2);
    assert_eq!(table.get(1).unwrap(), Some(rid(1)));
    assert_eq!(table.get(0x8000_0001).unwrap(), Some(rid(2)));
    table.verify_integrity().unwrap();
}

#[test]
fn test_volume_insert_remove_get() {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    let _ = env_logger::builder().is_test(true).try_init();

    let (bpm, _temp) = create_bpm(128);
    let table =
        ExtendibleHashTable::new(Arc::clone(&bpm), Box::new(Fnv1aHasher), 2, 9, 16).unwrap();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut keys: Vec<u32> = (0..2000).collect();
    keys.shuffle(&mut rng);

    for &key in &keys {
        assert!(table.insert(key, rid(key)).unwrap(), "insert {} failed", key);
    }
    table.verify_integrity().unwrap();

    for &key in &keys {
        assert_eq!(table.get(key).unwrap(), Some(rid(key)));
    }

    let (removed, kept) = keys.split_at(keys.len() / 2);
    for &key in removed {
        assert!(table.remove(key).unwrap(), "remove {} failed", key);
    }
    table.verify_integrity().unwrap();

    for &key in removed {
        assert_eq!(table.get(key).unwrap(), None);
    }
    for &key in kept {
        assert_eq!(table.get(key).unwrap(), Some(rid(key)));
    }
}
