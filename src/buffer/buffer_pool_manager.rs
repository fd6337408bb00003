use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{
    AccessType, FrameId, PageId, Result, RookError, INVALID_PAGE_ID, PAGE_SIZE,
};
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::page_guard::ReleaseCallback;
use super::{FrameHeader, LruKReplacer, PageGuard, ReadPageGuard, WritePageGuard};

/// Bookkeeping protected by the pool-wide latch. The latch is held for
/// the full duration of every public operation, disk I/O included; this
/// is simple but serializes the pool.
struct PoolInner {
    /// Maps resident page IDs to the frames holding them
    page_table: HashMap<PageId, FrameId>,
    /// Frames currently holding no page
    free_list: VecDeque<FrameId>,
    /// Monotonic page id allocator; ids are never reused
    next_page_id: u32,
}

struct PoolState {
    frames: Vec<Arc<FrameHeader>>,
    inner: Mutex<PoolInner>,
    replacer: LruKReplacer,
    disk_scheduler: DiskScheduler,
}

impl PoolState {
    /// The unpin path shared by `unpin_page` and the guard release
    /// callbacks. Returns false when the page is absent or already at
    /// pin count zero.
    fn unpin(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.as_usize()];

        match frame.unpin() {
            Some(remaining) => {
                if is_dirty {
                    frame.set_dirty(true);
                }
                if remaining == 0 {
                    self.replacer.set_evictable(frame_id, true);
                }
                true
            }
            None => false,
        }
    }
}

/// BufferPoolManager owns a fixed array of frames and maps disk pages
/// into them, coordinating pinning, dirty tracking and LRU-K eviction.
/// New pages come back pinned once; callers either wrap them in a guard
/// (`new_page_guarded`) or pair the call with an explicit `unpin_page`.
pub struct BufferPoolManager {
    pool_size: usize,
    state: Arc<PoolState>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, replacer_k: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(FrameHeader::new(frame_id)));
            free_list.push_back(frame_id);
        }

        let state = Arc::new(PoolState {
            frames,
            inner: Mutex::new(PoolInner {
                page_table: HashMap::new(),
                free_list,
                next_page_id: 0,
            }),
            replacer: LruKReplacer::new(pool_size, replacer_k),
            disk_scheduler: DiskScheduler::new(disk_manager),
        });

        Self { pool_size, state }
    }

    /// Allocates a fresh page: the frame comes from the free list or an
    /// eviction, the id from the monotonic allocator. The page is zeroed,
    /// clean, pinned once and non-evictable.
    pub fn new_page(&self) -> Result<PageId> {
        self.allocate_page().map(|(page_id, _)| page_id)
    }

    fn allocate_page(&self) -> Result<(PageId, FrameId)> {
        let mut inner = self.state.inner.lock();

        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.state.frames[frame_id.as_usize()];

        let page_id = PageId::new(inner.next_page_id);
        inner.next_page_id += 1;

        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();

        inner.page_table.insert(page_id, frame_id);
        self.state
            .replacer
            .record_access(frame_id, AccessType::Unknown);
        self.state.replacer.set_evictable(frame_id, false);

        Ok((page_id, frame_id))
    }

    /// Pins the page into a frame, reading it from disk if absent.
    fn fetch_page(&self, page_id: PageId, access_type: AccessType) -> Result<FrameId> {
        if page_id == INVALID_PAGE_ID {
            return Err(RookError::InvalidPageId(page_id));
        }

        let mut inner = self.state.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &self.state.frames[frame_id.as_usize()];
            frame.pin();
            self.state.replacer.record_access(frame_id, access_type);
            self.state.replacer.set_evictable(frame_id, false);
            return Ok(frame_id);
        }

        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.state.frames[frame_id.as_usize()];

        let mut data = [0u8; PAGE_SIZE];
        self.state
            .disk_scheduler
            .schedule_read_sync(page_id, &mut data)?;

        frame.set_page_id(page_id);
        frame.copy_from(&data);
        frame.set_dirty(false);
        frame.pin();

        inner.page_table.insert(page_id, frame_id);
        self.state.replacer.record_access(frame_id, access_type);
        self.state.replacer.set_evictable(frame_id, false);

        Ok(frame_id)
    }

    /// Frees a frame: the free list first, then an eviction. Dirty
    /// victims are written back before their frame is reused.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = self.state.replacer.evict() else {
            return Err(RookError::BufferPoolFull);
        };

        let frame = &self.state.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();
        log::debug!("evicting page {} from frame {}", old_page_id, frame_id);

        if frame.is_dirty() {
            let mut data = [0u8; PAGE_SIZE];
            frame.copy_to(&mut data);
            self.state
                .disk_scheduler
                .schedule_write_sync(old_page_id, &data)?;
        }

        inner.page_table.remove(&old_page_id);
        frame.reset();

        Ok(frame_id)
    }

    /// Drops one pin. Returns false when the page is absent or its pin
    /// count is already zero. The dirty flag ORs in: once dirty, a page
    /// stays dirty until flushed.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.state.unpin(page_id, is_dirty)
    }

    /// Synchronously writes the page back and clears its dirty flag.
    /// `Ok(false)` when the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Err(RookError::InvalidPageId(page_id));
        }

        let inner = self.state.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(false);
        };
        let frame = &self.state.frames[frame_id.as_usize()];

        let mut data = [0u8; PAGE_SIZE];
        frame.copy_to(&mut data);
        self.state.disk_scheduler.schedule_write_sync(page_id, &data)?;
        frame.set_dirty(false);

        Ok(true)
    }

    /// Writes back every resident page under a single latch acquisition.
    pub fn flush_all_pages(&self) -> Result<()> {
        let inner = self.state.inner.lock();

        for (&page_id, &frame_id) in inner.page_table.iter() {
            let frame = &self.state.frames[frame_id.as_usize()];
            let mut data = [0u8; PAGE_SIZE];
            frame.copy_to(&mut data);
            self.state.disk_scheduler.schedule_write_sync(page_id, &data)?;
            frame.set_dirty(false);
        }

        Ok(())
    }

    /// Removes the page from the pool. `Ok(true)` when absent (no-op) or
    /// removed, `Ok(false)` when the page is still pinned. Page ids are
    /// never reallocated.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.state.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = &self.state.frames[frame_id.as_usize()];

        if frame.pin_count() > 0 {
            return Ok(false);
        }

        inner.page_table.remove(&page_id);
        self.state.replacer.remove(frame_id);
        frame.reset();
        inner.free_list.push_back(frame_id);

        Ok(true)
    }

    /// Allocates a new page and wraps it in a basic guard; the pin taken
    /// at allocation becomes the guard's pin.
    pub fn new_page_guarded(&self) -> Result<PageGuard> {
        let (page_id, frame_id) = self.allocate_page()?;
        let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);
        Ok(PageGuard::new(page_id, frame, self.release_callback()))
    }

    /// Fetches a page and acquires its shared latch. The frame latch is
    /// taken only after the pool latch has been released.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard> {
        self.fetch_page_read_access(page_id, AccessType::Unknown)
    }

    pub fn fetch_page_read_access(
        &self,
        page_id: PageId,
        access_type: AccessType,
    ) -> Result<ReadPageGuard> {
        let frame_id = self.fetch_page(page_id, access_type)?;
        let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);
        Ok(unsafe { ReadPageGuard::new(page_id, frame, self.release_callback()) })
    }

    /// Fetches a page and acquires its exclusive latch.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard> {
        self.fetch_page_write_access(page_id, AccessType::Unknown)
    }

    pub fn fetch_page_write_access(
        &self,
        page_id: PageId,
        access_type: AccessType,
    ) -> Result<WritePageGuard> {
        let frame_id = self.fetch_page(page_id, access_type)?;
        let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);
        Ok(unsafe { WritePageGuard::new(page_id, frame, self.release_callback()) })
    }

    fn release_callback(&self) -> ReleaseCallback {
        let state = Arc::clone(&self.state);
        Box::new(move |page_id, is_dirty| {
            state.unpin(page_id, is_dirty);
        })
    }

    /// Pin count of a resident page, None when absent.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let inner = self.state.inner.lock();
        inner
            .page_table
            .get(&page_id)
            .map(|&frame_id| self.state.frames[frame_id.as_usize()].pin_count())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.inner.lock().free_list.len()
    }

    /// Number of evictable frames, as the replacer sees it.
    pub fn replacer_size(&self) -> usize {
        self.state.replacer.size()
    }
}
