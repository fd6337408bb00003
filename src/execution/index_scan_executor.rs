use std::sync::Arc;

use crate::catalog::{IndexInfo, TableInfo};
use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple, Value};

use super::expression::Expression;
use super::Executor;

/// Probes the hash index once with the literal key in `init`, caches the
/// matching record ids, then emits the live tuples.
pub struct IndexScanExecutor {
    table: Arc<TableInfo>,
    index: Arc<IndexInfo>,
    pred_key: Value,
    filter: Option<Expression>,
    rids: Vec<RecordId>,
    cursor: usize,
}

impl IndexScanExecutor {
    pub fn new(
        table: Arc<TableInfo>,
        index: Arc<IndexInfo>,
        pred_key: Value,
        filter: Option<Expression>,
    ) -> Self {
        Self {
            table,
            index,
            pred_key,
            filter,
            rids: Vec::new(),
            cursor: 0,
        }
    }
}

impl Executor for IndexScanExecutor {
    fn init(&mut self) -> Result<()> {
        self.rids.clear();
        self.cursor = 0;

        // The index is unique-key: the probe yields at most one rid.
        if let Value::Integer(key) = &self.pred_key {
            if let Some(rid) = self.index.index.get(*key as u32)? {
                self.rids.push(rid);
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        while self.cursor < self.rids.len() {
            let rid = self.rids[self.cursor];
            self.cursor += 1;

            let (meta, bytes) = self.table.heap.tuple(rid)?;
            if meta.is_deleted {
                continue;
            }

            let tuple = Tuple::from_bytes(Arc::clone(&self.table.schema), &bytes)?;
            if let Some(filter) = &self.filter {
                if !filter.evaluate(&tuple).is_true() {
                    continue;
                }
            }
            return Ok(Some((tuple, rid)));
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.table.schema
    }
}
