use std::sync::Arc;

use crate::catalog::TableInfo;
use crate::common::{RecordId, Result};
use crate::storage::TableIterator;
use crate::tuple::{Schema, Tuple};

use super::expression::Expression;
use super::Executor;

/// Walks the table heap in chain order, skipping tombstoned tuples and
/// rows the filter does not accept (null or false both reject).
pub struct SeqScanExecutor {
    table: Arc<TableInfo>,
    filter: Option<Expression>,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(table: Arc<TableInfo>, filter: Option<Expression>) -> Self {
        Self {
            table,
            filter,
            iter: None,
        }
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> Result<()> {
        self.iter = Some(self.table.heap.iter());
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let iter = self.iter.as_mut().expect("executor not initialized");

        loop {
            let Some(rid) = iter.next()? else {
                return Ok(None);
            };

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
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.table.schema
    }
}
