use std::sync::Arc;

use crate::catalog::TableInfo;
use crate::common::{RecordId, Result};
use crate::storage::page::TupleMeta;
use crate::tuple::{Schema, Tuple, Value};

use super::{dml_output_schema, Executor, ExecutorContext};

/// Drains the child, tombstones each row in the heap, removes it from
/// every index, and emits a single row holding the delete count.
pub struct DeleteExecutor {
    ctx: Arc<ExecutorContext>,
    table: Arc<TableInfo>,
    child: Box<dyn Executor>,
    output_schema: Arc<Schema>,
    done: bool,
}

impl DeleteExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, table: Arc<TableInfo>, child: Box<dyn Executor>) -> Self {
        Self {
            ctx,
            table,
            child,
            output_schema: dml_output_schema(),
            done: false,
        }
    }
}

impl Executor for DeleteExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        if self.done {
            return Ok(None);
        }

        let indexes = self.ctx.catalog.table_indexes(self.table.oid);
        let mut deleted: i32 = 0;

        while let Some((tuple, rid)) = self.child.next()? {
            self.table
                .heap
                .set_tuple_meta(rid, TupleMeta { is_deleted: true })?;

            for index_info in &indexes {
                if let Some(key) = index_info.key_of(&tuple)? {
                    index_info.index.remove(key)?;
                }
            }
            deleted += 1;
        }

        self.done = true;
        Ok(Some((
            Tuple::new(
                Arc::clone(&self.output_schema),
                vec![Value::Integer(deleted)],
            ),
            RecordId::invalid(),
        )))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}
