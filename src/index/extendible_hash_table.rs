use std::sync::Arc;

use crate::buffer::{BufferPoolManager, WritePageGuard};
use crate::common::{AccessType, PageId, RecordId, Result, INVALID_PAGE_ID};

use super::bucket_page::{HashBucketPage, HashBucketPageRef};
use super::directory_page::{HashDirectoryPage, HashDirectoryPageRef};
use super::hasher::KeyHasher;
use super::header_page::{HashHeaderPage, HashHeaderPageRef};

/// Disk-resident extendible hash table mapping unique `u32` keys to
/// record ids, built entirely out of buffer pool pages:
///
/// - a header page routing the hash's high bits to a directory,
/// - directory pages routing the low bits to buckets, growing and
///   shrinking their global depth on demand,
/// - bucket pages holding the entries.
///
/// Latching follows the crabbing discipline: the header latch is held
/// only long enough to locate (or register) the directory; lookups take
/// read latches top-down and release each parent before descending.
pub struct ExtendibleHashTable {
    bpm: Arc<BufferPoolManager>,
    header_page_id: PageId,
    hasher: Box<dyn KeyHasher>,
    directory_max_depth: u32,
    bucket_max_size: u32,
}

impl ExtendibleHashTable {
    pub fn new(
        bpm: Arc<BufferPoolManager>,
        hasher: Box<dyn KeyHasher>,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Result<Self> {
        let guard = bpm.new_page_guarded()?;
        let header_page_id = guard.page_id();
        {
            let mut write = guard.upgrade_write();
            let mut header = HashHeaderPage::new(write.data_mut());
            header.init(header_max_depth);
        }

        Ok(Self {
            bpm,
            header_page_id,
            hasher,
            directory_max_depth,
            bucket_max_size,
        })
    }

    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    fn hash(&self, key: u32) -> u32 {
        self.hasher.hash(&key.to_le_bytes())
    }

    /// Point lookup. Read latches are crabbed: each level's guard is
    /// dropped as soon as the child page id has been extracted.
    pub fn get(&self, key: u32) -> Result<Option<RecordId>> {
        let hash = self.hash(key);

        let directory_page_id = {
            let guard = self.bpm.fetch_page_read_access(self.header_page_id, AccessType::Index)?;
            let header = HashHeaderPageRef::new(guard.data());
            header.directory_page_id(header.directory_index(hash))
        };
        if directory_page_id == INVALID_PAGE_ID {
            return Ok(None);
        }

        let bucket_page_id = {
            let guard = self.bpm.fetch_page_read_access(directory_page_id, AccessType::Index)?;
            let directory = HashDirectoryPageRef::new(guard.data());
            directory.bucket_page_id(directory.bucket_index(hash))
        };
        if bucket_page_id == INVALID_PAGE_ID {
            return Ok(None);
        }

        let guard = self.bpm.fetch_page_read_access(bucket_page_id, AccessType::Index)?;
        let bucket = HashBucketPageRef::new(guard.data());
        Ok(bucket.lookup(key))
    }

    /// Inserts a unique key. Returns false on a duplicate key and on
    /// capacity exhaustion (full bucket at maximum directory depth).
    pub fn insert(&self, key: u32, rid: RecordId) -> Result<bool> {
        let hash = self.hash(key);

        // Locate the directory, creating it on first contact. The header
        // latch is released before descending.
        let directory_page_id = {
            let mut header_guard = self.bpm.fetch_page_write_access(self.header_page_id, AccessType::Index)?;
            let (directory_index, existing) = {
                let header = HashHeaderPageRef::new(header_guard.data());
                let idx = header.directory_index(hash);
                (idx, header.directory_page_id(idx))
            };
            if existing == INVALID_PAGE_ID {
                return self.insert_to_new_directory(&mut header_guard, directory_index, hash, key, rid);
            }
            existing
        };

        let mut directory_guard = self.bpm.fetch_page_write_access(directory_page_id, AccessType::Index)?;

        let bucket_page_id = {
            let directory = HashDirectoryPageRef::new(directory_guard.data());
            directory.bucket_page_id(directory.bucket_index(hash))
        };
        if bucket_page_id == INVALID_PAGE_ID {
            let bucket_index = {
                let directory = HashDirectoryPageRef::new(directory_guard.data());
                directory.bucket_index(hash)
            };
            return self.insert_to_new_bucket(&mut directory_guard, bucket_index, key, rid);
        }

        let mut bucket_guard = self.bpm.fetch_page_write_access(bucket_page_id, AccessType::Index)?;
        {
            let bucket = HashBucketPageRef::new(bucket_guard.data());
            if bucket.lookup(key).is_some() {
                return Ok(false);
            }
            if !bucket.is_full() {
                let mut bucket = HashBucketPage::new(bucket_guard.data_mut());
                return Ok(bucket.insert(key, rid));
            }
        }

        // The bucket is full: split until the key fits or the directory
        // is exhausted. The loop handles the pathological case where
        // every entry rehashes into the same image and the bucket stays
        // full.
        loop {
            {
                let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
                let bucket_index = directory.bucket_index(hash);
                if directory.local_depth(bucket_index) == directory.global_depth() {
                    if directory.global_depth() == directory.max_depth() {
                        log::debug!("hash table full: key {} rejected at max depth", key);
                        return Ok(false);
                    }
                    directory.incr_global_depth();
                }
            }

            let new_bucket_guard = self.bpm.new_page_guarded()?;
            let new_bucket_page_id = new_bucket_guard.page_id();
            let mut new_bucket_guard = new_bucket_guard.upgrade_write();
            {
                let mut new_bucket = HashBucketPage::new(new_bucket_guard.data_mut());
                new_bucket.init(self.bucket_max_size);
            }

            {
                let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
                let bucket_index = directory.bucket_index(hash);
                directory.incr_local_depth(bucket_index);
                let new_local_depth = directory.local_depth(bucket_index);
                log::trace!(
                    "splitting bucket at slot {:#b} to depth {}",
                    bucket_index,
                    new_local_depth
                );
                Self::update_directory_mapping(
                    &mut directory,
                    bucket_index,
                    new_bucket_page_id,
                    new_local_depth,
                );
            }

            // Rehash: entries whose slot now maps to the new bucket move.
            {
                let directory = HashDirectoryPageRef::new(directory_guard.data());
                let mut old_bucket = HashBucketPage::new(bucket_guard.data_mut());
                let mut new_bucket = HashBucketPage::new(new_bucket_guard.data_mut());

                let mut i = 0;
                while i < old_bucket.size() {
                    let entry_key = old_bucket.key_at(i);
                    let entry_rid = old_bucket.value_at(i);
                    let entry_slot = directory.bucket_index(self.hash(entry_key));
                    if directory.bucket_page_id(entry_slot) == new_bucket_page_id {
                        new_bucket.insert(entry_key, entry_rid);
                        old_bucket.remove_at(i);
                    } else {
                        i += 1;
                    }
                }
            }

            // Retry against whichever image the key now maps to.
            let lands_in_new = {
                let directory = HashDirectoryPageRef::new(directory_guard.data());
                directory.bucket_page_id(directory.bucket_index(hash)) == new_bucket_page_id
            };
            if lands_in_new {
                let mut new_bucket = HashBucketPage::new(new_bucket_guard.data_mut());
                if new_bucket.insert(key, rid) {
                    return Ok(true);
                }
                // The new image filled up entirely; split it next round.
                bucket_guard = new_bucket_guard;
            } else {
                let mut old_bucket = HashBucketPage::new(bucket_guard.data_mut());
                if old_bucket.insert(key, rid) {
                    return Ok(true);
                }
            }
        }
    }

    /// Removes a key. An emptied bucket merges with its split image when
    /// their depths match, recursively, and the directory shrinks while
    /// every slot sits below the global depth.
    pub fn remove(&self, key: u32) -> Result<bool> {
        let hash = self.hash(key);

        let directory_page_id = {
            let guard = self.bpm.fetch_page_read_access(self.header_page_id, AccessType::Index)?;
            let header = HashHeaderPageRef::new(guard.data());
            header.directory_page_id(header.directory_index(hash))
        };
        if directory_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let mut directory_guard = self.bpm.fetch_page_write_access(directory_page_id, AccessType::Index)?;

        let (mut bucket_index, bucket_page_id) = {
            let directory = HashDirectoryPageRef::new(directory_guard.data());
            let idx = directory.bucket_index(hash);
            (idx, directory.bucket_page_id(idx))
        };
        if bucket_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let mut bucket_guard = self.bpm.fetch_page_write_access(bucket_page_id, AccessType::Index)?;
        {
            let mut bucket = HashBucketPage::new(bucket_guard.data_mut());
            if !bucket.remove(key) {
                return Ok(false);
            }
        }

        loop {
            {
                let bucket = HashBucketPageRef::new(bucket_guard.data());
                if !bucket.is_empty() {
                    break;
                }
            }

            let (local_depth, merge_page_id) = {
                let directory = HashDirectoryPageRef::new(directory_guard.data());
                let local_depth = directory.local_depth(bucket_index);
                if local_depth == 0 {
                    break;
                }
                let split_image_index =
                    (bucket_index & ((1 << local_depth) - 1)) ^ (1 << (local_depth - 1));
                if directory.local_depth(split_image_index) != local_depth {
                    // Buckets merge only with a split image at the same
                    // local depth.
                    break;
                }
                (local_depth, directory.bucket_page_id(split_image_index))
            };

            // Release and delete the emptied bucket's page.
            let empty_page_id = bucket_guard.page_id();
            drop(bucket_guard);
            log::trace!("merging empty bucket page {} into {}", empty_page_id, merge_page_id);

            let merged_index;
            {
                let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
                let new_local_depth = local_depth - 1;
                let merged_mask = (1u32 << new_local_depth) - 1;
                merged_index = bucket_index & merged_mask;
                for i in 0..directory.size() {
                    if i & merged_mask == merged_index {
                        directory.set_bucket_page_id(i, merge_page_id);
                        directory.set_local_depth(i, new_local_depth as u8);
                    }
                }
                while directory.can_shrink() {
                    directory.decr_global_depth();
                }
            }
            self.bpm.delete_page(empty_page_id)?;

            // The surviving bucket may itself be empty; re-examine it.
            bucket_index = merged_index;
            bucket_guard = self.bpm.fetch_page_write_access(merge_page_id, AccessType::Index)?;
        }

        {
            let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
            while directory.can_shrink() {
                directory.decr_global_depth();
            }
        }

        Ok(true)
    }

    fn insert_to_new_directory(
        &self,
        header_guard: &mut WritePageGuard,
        directory_index: u32,
        hash: u32,
        key: u32,
        rid: RecordId,
    ) -> Result<bool> {
        let guard = self.bpm.new_page_guarded()?;
        let directory_page_id = guard.page_id();
        let mut directory_guard = guard.upgrade_write();
        {
            let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
            directory.init(self.directory_max_depth);
        }
        {
            let mut header = HashHeaderPage::new(header_guard.data_mut());
            header.set_directory_page_id(directory_index, directory_page_id);
        }

        let bucket_index = {
            let directory = HashDirectoryPageRef::new(directory_guard.data());
            directory.bucket_index(hash)
        };
        self.insert_to_new_bucket(&mut directory_guard, bucket_index, key, rid)
    }

    fn insert_to_new_bucket(
        &self,
        directory_guard: &mut WritePageGuard,
        bucket_index: u32,
        key: u32,
        rid: RecordId,
    ) -> Result<bool> {
        let guard = self.bpm.new_page_guarded()?;
        let bucket_page_id = guard.page_id();
        let mut bucket_guard = guard.upgrade_write();
        {
            let mut bucket = HashBucketPage::new(bucket_guard.data_mut());
            bucket.init(self.bucket_max_size);
        }
        {
            let mut directory = HashDirectoryPage::new(directory_guard.data_mut());
            directory.set_bucket_page_id(bucket_index, bucket_page_id);
            directory.set_local_depth(bucket_index, 0);
        }

        let mut bucket = HashBucketPage::new(bucket_guard.data_mut());
        Ok(bucket.insert(key, rid))
    }

    /// After a split raised the slot's local depth to `new_local_depth`,
    /// repoint every slot of the flipped image at the new bucket and
    /// stamp the new depth on both images.
    fn update_directory_mapping(
        directory: &mut HashDirectoryPage<'_>,
        old_bucket_index: u32,
        new_bucket_page_id: PageId,
        new_local_depth: u32,
    ) {
        let mask = (1u32 << new_local_depth) - 1;
        let old_disc = old_bucket_index & mask;
        let new_disc = old_disc ^ (1 << (new_local_depth - 1));

        for i in 0..directory.size() {
            let disc = i & mask;
            if disc == new_disc {
                directory.set_bucket_page_id(i, new_bucket_page_id);
                directory.set_local_depth(i, new_local_depth as u8);
            } else if disc == old_disc {
                directory.set_local_depth(i, new_local_depth as u8);
            }
        }
    }

    /// Live directory page ids, in header slot order. Intended for tests
    /// that inspect directory or bucket pages directly.
    pub fn directory_page_ids(&self) -> Result<Vec<PageId>> {
        let guard = self.bpm.fetch_page_read_access(self.header_page_id, AccessType::Index)?;
        let header = HashHeaderPageRef::new(guard.data());
        let mut ids = Vec::new();
        for i in 0..header.max_size() {
            let page_id = header.directory_page_id(i);
            if page_id != INVALID_PAGE_ID {
                ids.push(page_id);
            }
        }
        Ok(ids)
    }

    /// Walks the whole structure asserting the extendible hashing
    /// invariants: depth-class agreement in every directory, and every
    /// bucket entry hashing into its slot's discriminator.
    pub fn verify_integrity(&self) -> Result<()> {
        for directory_page_id in self.directory_page_ids()? {
            let directory_guard = self.bpm.fetch_page_read_access(directory_page_id, AccessType::Index)?;
            let directory = HashDirectoryPageRef::new(directory_guard.data());

            for i in 0..directory.size() {
                let local_depth = directory.local_depth(i);
                assert!(
                    local_depth <= directory.global_depth(),
                    "slot {} local depth above global depth",
                    i
                );
                let mask = (1 << local_depth) - 1;
                let canonical = i & mask;
                assert_eq!(directory.bucket_page_id(i), directory.bucket_page_id(canonical));
                assert_eq!(directory.local_depth(i), directory.local_depth(canonical));

                let bucket_page_id = directory.bucket_page_id(i);
                if bucket_page_id == INVALID_PAGE_ID || i != canonical {
                    continue;
                }
                let bucket_guard = self.bpm.fetch_page_read_access(bucket_page_id, AccessType::Index)?;
                let bucket = HashBucketPageRef::new(bucket_guard.data());
                for j in 0..bucket.size() {
                    let hash = self.hash(bucket.key_at(j));
                    assert_eq!(
                        hash & mask,
                        i & mask,
                        "key {} stored in bucket it does not hash to",
                        bucket.key_at(j)
                    );
                }
            }
        }
        Ok(())
    }
}
