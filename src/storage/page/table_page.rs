use crate::common::{PageId, Result, RookError, SlotId, INVALID_PAGE_ID, PAGE_SIZE};

/// Slotted heap page layout:
///
/// +------------------+
/// | Header (16 B)    |  page_id, next_page_id, num_slots, free bounds
/// +------------------+
/// | Slot Array       |  grows downward, 6 bytes per slot
/// +------------------+
/// | Free Space       |
/// +------------------+
/// | Tuple Data       |  grows upward from the end of the page
/// +------------------+
///
/// Each slot entry holds `offset: u16`, `length: u16`, `flags: u16`.
/// Bit 0 of the flags word is the tombstone: deleted tuples keep their
/// bytes and their slot, and scans skip them.
const HEADER_SIZE: usize = 16;
const SLOT_SIZE: usize = 6;

const PAGE_ID_OFFSET: usize = 0;
const NEXT_PAGE_ID_OFFSET: usize = 4;
const NUM_SLOTS_OFFSET: usize = 8;
const FREE_SPACE_START_OFFSET: usize = 10;
const FREE_SPACE_END_OFFSET: usize = 12;

const TOMBSTONE_FLAG: u16 = 1;

/// In-memory view of a tuple's metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TupleMeta {
    pub is_deleted: bool,
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Mutable view over a heap page.
pub struct TablePage<'a> {
    data: &'a mut [u8],
}

impl<'a> TablePage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    /// Initializes a fresh heap page with no successor.
    pub fn init(&mut self, page_id: PageId) {
        self.data.fill(0);
        write_u32(self.data, PAGE_ID_OFFSET, page_id.as_u32());
        write_u32(self.data, NEXT_PAGE_ID_OFFSET, INVALID_PAGE_ID.as_u32());
        write_u16(self.data, NUM_SLOTS_OFFSET, 0);
        write_u16(self.data, FREE_SPACE_START_OFFSET, HEADER_SIZE as u16);
        write_u16(self.data, FREE_SPACE_END_OFFSET, PAGE_SIZE as u16);
    }

    pub fn page_id(&self) -> PageId {
        PageId::new(read_u32(self.data, PAGE_ID_OFFSET))
    }

    pub fn next_page_id(&self) -> Option<PageId> {
        let raw = PageId::new(read_u32(self.data, NEXT_PAGE_ID_OFFSET));
        (raw != INVALID_PAGE_ID).then_some(raw)
    }

    pub fn set_next_page_id(&mut self, page_id: Option<PageId>) {
        let raw = page_id.unwrap_or(INVALID_PAGE_ID);
        write_u32(self.data, NEXT_PAGE_ID_OFFSET, raw.as_u32());
    }

    pub fn num_slots(&self) -> u16 {
        read_u16(self.data, NUM_SLOTS_OFFSET)
    }

    pub fn free_space(&self) -> usize {
        let start = read_u16(self.data, FREE_SPACE_START_OFFSET) as usize;
        let end = read_u16(self.data, FREE_SPACE_END_OFFSET) as usize;
        end.saturating_sub(start)
    }

    pub fn can_insert(&self, tuple_size: usize) -> bool {
        self.free_space() >= tuple_size + SLOT_SIZE
    }

    fn slot_offset(&self, slot_id: SlotId) -> usize {
        HEADER_SIZE + (slot_id.as_u16() as usize) * SLOT_SIZE
    }

    fn slot_entry(&self, slot_id: SlotId) -> Option<(u16, u16, u16)> {
        if slot_id.as_u16() >= self.num_slots() {
            return None;
        }
        let base = self.slot_offset(slot_id);
        Some((
            read_u16(self.data, base),
            read_u16(self.data, base + 2),
            read_u16(self.data, base + 4),
        ))
    }

    /// Appends a tuple and returns its slot. Slots are never reused.
    pub fn insert_tuple(&mut self, tuple: &[u8]) -> Result<SlotId> {
        if !self.can_insert(tuple.len()) {
            return Err(RookError::PageOverflow {
                tuple_size: tuple.len(),
                available: self.free_space().saturating_sub(SLOT_SIZE),
            });
        }

        let slot_id = SlotId::new(self.num_slots());
        let tuple_offset = read_u16(self.data, FREE_SPACE_END_OFFSET) - tuple.len() as u16;

        self.data[tuple_offset as usize..tuple_offset as usize + tuple.len()]
            .copy_from_slice(tuple);

        let base = self.slot_offset(slot_id);
        write_u16(self.data, base, tuple_offset);
        write_u16(self.data, base + 2, tuple.len() as u16);
        write_u16(self.data, base + 4, 0);

        write_u16(self.data, NUM_SLOTS_OFFSET, slot_id.as_u16() + 1);
        write_u16(
            self.data,
            FREE_SPACE_START_OFFSET,
            (base + SLOT_SIZE) as u16,
        );
        write_u16(self.data, FREE_SPACE_END_OFFSET, tuple_offset);

        Ok(slot_id)
    }

    pub fn tuple(&self, slot_id: SlotId) -> Result<&[u8]> {
        let (offset, length, _) = self
            .slot_entry(slot_id)
            .ok_or(RookError::InvalidSlotId(slot_id.as_u16()))?;
        Ok(&self.data[offset as usize..offset as usize + length as usize])
    }

    pub fn tuple_meta(&self, slot_id: SlotId) -> Result<TupleMeta> {
        let (_, _, flags) = self
            .slot_entry(slot_id)
            .ok_or(RookError::InvalidSlotId(slot_id.as_u16()))?;
        Ok(TupleMeta {
            is_deleted: flags & TOMBSTONE_FLAG != 0,
        })
    }

    pub fn set_tuple_meta(&mut self, slot_id: SlotId, meta: TupleMeta) -> Result<()> {
        let (_, _, flags) = self
            .slot_entry(slot_id)
            .ok_or(RookError::InvalidSlotId(slot_id.as_u16()))?;
        let flags = if meta.is_deleted {
            flags | TOMBSTONE_FLAG
        } else {
            flags & !TOMBSTONE_FLAG
        };
        let base = self.slot_offset(slot_id);
        write_u16(self.data, base + 4, flags);
        Ok(())
    }

    /// Number of slots whose tombstone is not set.
    pub fn live_tuple_count(&self) -> usize {
        (0..self.num_slots())
            .filter(|&i| {
                self.tuple_meta(SlotId::new(i))
                    .map(|m| !m.is_deleted)
                    .unwrap_or(false)
            })
            .count()
    }
}

/// Read-only view over a heap page.
pub struct TablePageRef<'a> {
    data: &'a [u8],
}

impl<'a> TablePageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn page_id(&self) -> PageId {
        PageId::new(read_u32(self.data, PAGE_ID_OFFSET))
    }

    pub fn next_page_id(&self) -> Option<PageId> {
        let raw = PageId::new(read_u32(self.data, NEXT_PAGE_ID_OFFSET));
        (raw != INVALID_PAGE_ID).then_some(raw)
    }

    pub fn num_slots(&self) -> u16 {
        read_u16(self.data, NUM_SLOTS_OFFSET)
    }

    fn slot_entry(&self, slot_id: SlotId) -> Option<(u16, u16, u16)> {
        if slot_id.as_u16() >= self.num_slots() {
            return None;
        }
        let base = HEADER_SIZE + (slot_id.as_u16() as usize) * SLOT_SIZE;
        Some((
            read_u16(self.data, base),
            read_u16(self.data, base + 2),
            read_u16(self.data, base + 4),
        ))
    }

    pub fn tuple(&self, slot_id: SlotId) -> Result<&[u8]> {
        let (offset, length, _) = self
            .slot_entry(slot_id)
            .ok_or(RookError::InvalidSlotId(slot_id.as_u16()))?;
        Ok(&self.data[offset as usize..offset as usize + length as usize])
    }

    pub fn tuple_meta(&self, slot_id: SlotId) -> Result<TupleMeta> {
        let (_, _, flags) = self
            .slot_entry(slot_id)
            .ok_or(RookError::InvalidSlotId(slot_id.as_u16()))?;
        Ok(TupleMeta {
            is_deleted: flags & TOMBSTONE_FLAG != 0,
        })
    }
}
