use std::sync::Arc;

use crate::buffer::BufferPoolManager;
use crate::catalog::Catalog;
use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple};

/// Shared context handed to every executor. The transaction id is an
/// opaque handle carried through for the layers above this core.
pub struct ExecutorContext {
    pub catalog: Arc<Catalog>,
    pub bpm: Arc<BufferPoolManager>,
    pub txn_id: u64,
}

impl ExecutorContext {
    pub fn new(catalog: Arc<Catalog>, bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            catalog,
            bpm,
            txn_id: 0,
        }
    }
}

/// Pull-based iterator contract. `init` resets state and materializes
/// any pipeline breaker; `next` produces at most one row per call and
/// None at end of stream. Rows that exist in a heap carry their record
/// id; computed rows carry [`RecordId::invalid`].
pub trait Executor {
    fn init(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>>;
    fn output_schema(&self) -> &Arc<Schema>;
}
