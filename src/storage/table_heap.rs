use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::BufferPoolManager;
use crate::common::{AccessType, PageId, RecordId, Result, SlotId};

use super::page::{TablePage, TablePageRef, TupleMeta};

/// An append-only heap of tuples stored as a singly linked chain of
/// slotted pages. Deletion tombstones the slot in place; bytes are never
/// reclaimed (the executors' delete is a metadata update).
pub struct TableHeap {
    bpm: Arc<BufferPoolManager>,
    first_page_id: PageId,
    /// Insertion always targets the chain tail.
    last_page_id: Mutex<PageId>,
}

impl TableHeap {
    /// Creates an empty heap with a single initialized page.
    pub fn new(bpm: Arc<BufferPoolManager>) -> Result<Self> {
        let guard = bpm.new_page_guarded()?;
        let first_page_id = guard.page_id();
        {
            let mut write = guard.upgrade_write();
            let mut page = TablePage::new(write.data_mut());
            page.init(first_page_id);
        }

        Ok(Self {
            bpm,
            first_page_id,
            last_page_id: Mutex::new(first_page_id),
        })
    }

    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    /// Appends a tuple, growing the chain when the tail page is full.
    pub fn insert_tuple(&self, tuple: &[u8]) -> Result<RecordId> {
        let mut last_page_id = self.last_page_id.lock();

        {
            let mut guard = self.bpm.fetch_page_write(*last_page_id)?;
            let mut page = TablePage::new(guard.data_mut());
            if page.can_insert(tuple.len()) {
                let slot_id = page.insert_tuple(tuple)?;
                return Ok(RecordId::new(*last_page_id, slot_id));
            }
        }

        // Tail is full: link a fresh page and retry there.
        let new_guard = self.bpm.new_page_guarded()?;
        let new_page_id = new_guard.page_id();
        {
            let mut write = new_guard.upgrade_write();
            let mut page = TablePage::new(write.data_mut());
            page.init(new_page_id);
        }
        {
            let mut guard = self.bpm.fetch_page_write(*last_page_id)?;
            let mut page = TablePage::new(guard.data_mut());
            page.set_next_page_id(Some(new_page_id));
        }
        *last_page_id = new_page_id;

        let mut guard = self.bpm.fetch_page_write(new_page_id)?;
        let mut page = TablePage::new(guard.data_mut());
        let slot_id = page.insert_tuple(tuple)?;
        Ok(RecordId::new(new_page_id, slot_id))
    }

    /// Reads a tuple's bytes and metadata.
    pub fn tuple(&self, rid: RecordId) -> Result<(TupleMeta, Vec<u8>)> {
        let guard = self
            .bpm
            .fetch_page_read_access(rid.page_id, AccessType::Lookup)?;
        let page = TablePageRef::new(guard.data());
        let meta = page.tuple_meta(rid.slot_id)?;
        let bytes = page.tuple(rid.slot_id)?.to_vec();
        Ok((meta, bytes))
    }

    pub fn tuple_meta(&self, rid: RecordId) -> Result<TupleMeta> {
        let guard = self
            .bpm
            .fetch_page_read_access(rid.page_id, AccessType::Lookup)?;
        let page = TablePageRef::new(guard.data());
        page.tuple_meta(rid.slot_id)
    }

    /// Rewrites a tuple's metadata (tombstone set or clear).
    pub fn set_tuple_meta(&self, rid: RecordId, meta: TupleMeta) -> Result<()> {
        let mut guard = self.bpm.fetch_page_write(rid.page_id)?;
        let mut page = TablePage::new(guard.data_mut());
        page.set_tuple_meta(rid.slot_id, meta)
    }

    /// Iterator over every record id in chain order, tombstones included;
    /// callers filter on the metadata.
    pub fn iter(&self) -> TableIterator {
        TableIterator {
            bpm: Arc::clone(&self.bpm),
            current_page_id: Some(self.first_page_id),
            next_slot: 0,
        }
    }
}

/// Walks the page chain slot by slot. Pages are fetched with Scan access
/// so the walk does not disturb the replacement history.
pub struct TableIterator {
    bpm: Arc<BufferPoolManager>,
    current_page_id: Option<PageId>,
    next_slot: u16,
}

impl TableIterator {
    pub fn next(&mut self) -> Result<Option<RecordId>> {
        loop {
            let Some(page_id) = self.current_page_id else {
                return Ok(None);
            };

            let guard = self
                .bpm
                .fetch_page_read_access(page_id, AccessType::Scan)?;
            let page = TablePageRef::new(guard.data());

            if self.next_slot < page.num_slots() {
                let rid = RecordId::new(page_id, SlotId::new(self.next_slot));
                self.next_slot += 1;
                return Ok(Some(rid));
            }

            self.current_page_id = page.next_page_id();
            self.next_slot = 0;
        }
    }
}
