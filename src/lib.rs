//! rookdb - the storage-and-execution core of a disk-oriented relational
//! engine.
//!
//! Data lives on disk in fixed-size pages; a buffer pool caches the hot
//! set in memory and an extendible hash index provides point lookups, all
//! driven by a pull-based executor pipeline.
//!
//! # Architecture
//!
//! - **Storage layer** (`storage`): disk I/O and heap page organization
//!   - `DiskManager`: moves pages between memory and the backing file
//!   - `DiskScheduler`: queues I/O onto a background worker
//!   - `TablePage` / `TableHeap`: slotted tuple storage with tombstones
//!
//! - **Buffer pool** (`buffer`): memory management for database pages
//!   - `BufferPoolManager`: pins pages into a fixed set of frames
//!   - `LruKReplacer`: LRU-K eviction policy
//!   - `ReadPageGuard` / `WritePageGuard`: RAII pin-and-latch handles
//!
//! - **Index** (`index`): three-level disk-resident extendible hash table
//!   (header, directory, bucket pages) built on the buffer pool
//!
//! - **Primer** (`trie`): persistent copy-on-write trie with structural
//!   sharing
//!
//! - **Catalog** (`catalog`): in-memory table and index metadata
//!
//! - **Execution** (`execution`): scan, DML, join and aggregation
//!   executors over the `Executor` pull contract
//!
//! - **Optimizer** (`optimizer`): the seq-scan-to-index-scan rewrite
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rookdb::buffer::BufferPoolManager;
//! use rookdb::index::{ExtendibleHashTable, Fnv1aHasher};
//! use rookdb::storage::disk::DiskManager;
//! use rookdb::common::{RecordId, PageId, SlotId};
//!
//! let disk_manager = Arc::new(DiskManager::new("test.db").unwrap());
//! let bpm = Arc::new(BufferPoolManager::new(100, 2, disk_manager));
//!
//! let index = ExtendibleHashTable::new(bpm, Box::new(Fnv1aHasher), 9, 9, 256).unwrap();
//! let rid = RecordId::new(PageId::new(4), SlotId::new(0));
//! index.insert(42, rid).unwrap();
//! assert_eq!(index.get(42).unwrap(), Some(rid));
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod execution;
pub mod index;
pub mod optimizer;
pub mod storage;
pub mod trie;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{FrameId, PageId, RecordId, Result, RookError, SlotId};
