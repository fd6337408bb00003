use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, PAGE_SIZE};

use super::FrameHeader;

/// Callback invoked exactly once when a guard is released; routes back to
/// the buffer pool's unpin path with the guard's dirty flag.
pub(crate) type ReleaseCallback = Box<dyn FnOnce(PageId, bool) + Send + Sync>;

/// Shared guard plumbing: the frame is kept alive through the Arc, and
/// the callback is taken on drop so releasing is idempotent.
struct GuardCore {
    page_id: PageId,
    frame: Arc<FrameHeader>,
    release: Option<ReleaseCallback>,
    is_dirty: bool,
}

impl GuardCore {
    fn new(page_id: PageId, frame: Arc<FrameHeader>, release: ReleaseCallback) -> Self {
        Self {
            page_id,
            frame,
            release: Some(release),
            is_dirty: false,
        }
    }

    fn release(&mut self) {
        if let Some(callback) = self.release.take() {
            callback(self.page_id, self.is_dirty);
        }
    }
}

/// Basic guard: holds a pin but no latch. Produced by
/// `BufferPoolManager::new_page_guarded`; page data is only reachable by
/// upgrading to a typed guard, so a basic guard always unpins clean.
pub struct PageGuard {
    core: GuardCore,
}

impl PageGuard {
    pub(crate) fn new(page_id: PageId, frame: Arc<FrameHeader>, release: ReleaseCallback) -> Self {
        Self {
            core: GuardCore::new(page_id, frame, release),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.core.page_id
    }

    /// Consumes the guard and acquires the frame's shared latch. The pin
    /// carries over; there is no window in which the page is unpinned.
    pub fn upgrade_read(mut self) -> ReadPageGuard {
        let release = self.core.release.take().expect("guard already released");
        let frame = Arc::clone(&self.core.frame);
        unsafe { ReadPageGuard::new(self.core.page_id, frame, release) }
    }

    /// Consumes the guard and acquires the frame's exclusive latch.
    pub fn upgrade_write(mut self) -> WritePageGuard {
        let release = self.core.release.take().expect("guard already released");
        let frame = Arc::clone(&self.core.frame);
        unsafe { WritePageGuard::new(self.core.page_id, frame, release) }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.core.release();
    }
}

/// RAII guard for shared access to a page. Holds the frame's read latch
/// from construction; on drop the latch is released before the unpin.
pub struct ReadPageGuard {
    core: GuardCore,
    data_guard: Option<RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl ReadPageGuard {
    /// # Safety
    /// The latch guard is transmuted to 'static; the frame it borrows
    /// from is kept alive by the Arc stored alongside it, and the guard
    /// is dropped before the Arc.
    pub(crate) unsafe fn new(
        page_id: PageId,
        frame: Arc<FrameHeader>,
        release: ReleaseCallback,
    ) -> Self {
        let data_guard = frame.data.read();
        let data_guard: RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>> =
            std::mem::transmute(data_guard);

        Self {
            core: GuardCore::new(page_id, frame, release),
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.core.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }

    pub fn drop_guard(self) {
        drop(self);
    }
}

impl Deref for ReadPageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        // Latch first, then unpin.
        self.data_guard.take();
        self.core.release();
    }
}

/// RAII guard for exclusive access to a page. Mutable access marks the
/// guard dirty; the dirty flag reaches the frame at unpin time.
pub struct WritePageGuard {
    core: GuardCore,
    data_guard: Option<RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl WritePageGuard {
    /// # Safety
    /// Same lifetime argument as [`ReadPageGuard::new`].
    pub(crate) unsafe fn new(
        page_id: PageId,
        frame: Arc<FrameHeader>,
        release: ReleaseCallback,
    ) -> Self {
        let data_guard = frame.data.write();
        let data_guard: RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>> =
            std::mem::transmute(data_guard);

        Self {
            core: GuardCore::new(page_id, frame, release),
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.core.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.core.is_dirty = true;
        &mut self.data_guard.as_mut().unwrap()[..]
    }

    pub fn drop_guard(self) {
        drop(self);
    }
}

impl Deref for WritePageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl DerefMut for WritePageGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data_mut()
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        self.data_guard.take();
        self.core.release();
    }
}
