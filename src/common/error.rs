use thiserror::Error;

use super::types::{PageId, SlotId};

/// Database error types
#[derive(Error, Debug)]
pub enum RookError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page {0} not found")]
    PageNotFound(PageId),

    #[error("Buffer pool is full, no evictable frames available")]
    BufferPoolFull,

    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("Page {0} is still pinned")]
    PageStillPinned(PageId),

    #[error("Disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("Page overflow: tuple size {tuple_size} exceeds available space {available}")]
    PageOverflow { tuple_size: usize, available: usize },

    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(u16),

    #[error("Slot {0:?} is empty")]
    EmptySlot(SlotId),

    #[error("Tuple encoding error: {0}")]
    TupleEncoding(String),

    #[error("Table {0} not found")]
    TableNotFound(u32),

    #[error("Table {0:?} already exists")]
    TableAlreadyExists(String),

    #[error("Index {0} not found")]
    IndexNotFound(u32),

    #[error("Column {0:?} not found")]
    ColumnNotFound(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, RookError>;
