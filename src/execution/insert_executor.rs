use std::sync::Arc;

use crate::catalog::TableInfo;
use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple, Value};

use super::{dml_output_schema, Executor, ExecutorContext};

/// Drains the child, appends every row to the heap and to each of the
/// table's indexes, then emits a single row holding the insert count.
pub struct InsertExecutor {
    ctx: Arc<ExecutorContext>,
    table: Arc<TableInfo>,
    child: Box<dyn Executor>,
    output_schema: Arc<Schema>,
    done: bool,
}

impl InsertExecutor {
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

impl Executor for InsertExecutor {
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
        let mut inserted: i32 = 0;

        while let Some((tuple, _)) = self.child.next()? {
            let rid = self.table.heap.insert_tuple(&tuple.to_bytes()?)?;

            for index_info in &indexes {
                if let Some(key) = index_info.key_of(&tuple)? {
                    index_info.index.insert(key, rid)?;
                }
            }
            inserted += 1;
        }

        self.done = true;
        Ok(Some((
            Tuple::new(
                Arc::clone(&self.output_schema),
                vec![Value::Integer(inserted)],
            ),
            RecordId::invalid(),
        )))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}
