use std::sync::Arc;

use crate::catalog::TableInfo;
use crate::common::{RecordId, Result};
use crate::storage::page::TupleMeta;
use crate::tuple::{Schema, Tuple, Value};

use super::expression::Expression;
use super::{dml_output_schema, Executor, ExecutorContext};

/// Non-in-place update: each matching row is tombstoned and its
/// replacement (the target expressions evaluated over the old row)
/// appended, with every index maintained on both sides. Emits a single
/// row holding the update count.
pub struct UpdateExecutor {
    ctx: Arc<ExecutorContext>,
    table: Arc<TableInfo>,
    target_values: Vec<Expression>,
    child: Box<dyn Executor>,
    output_schema: Arc<Schema>,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        table: Arc<TableInfo>,
        target_values: Vec<Expression>,
        child: Box<dyn Executor>,
    ) -> Self {
        assert_eq!(
            target_values.len(),
            table.schema.column_count(),
            "update target list must cover the full table schema"
        );
        Self {
            ctx,
            table,
            target_values,
            child,
            output_schema: dml_output_schema(),
            done: false,
        }
    }
}

impl Executor for UpdateExecutor {
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
        let mut updated: i32 = 0;

        while let Some((old_tuple, rid)) = self.child.next()? {
            // Delete the old version.
            self.table
                .heap
                .set_tuple_meta(rid, TupleMeta { is_deleted: true })?;
            for index_info in &indexes {
                if let Some(key) = index_info.key_of(&old_tuple)? {
                    index_info.index.remove(key)?;
                }
            }

            // Insert the new version.
            let new_values: Vec<_> = self
                .target_values
                .iter()
                .map(|expr| expr.evaluate(&old_tuple))
                .collect();
            let new_tuple = Tuple::new(Arc::clone(&self.table.schema), new_values);
            let new_rid = self.table.heap.insert_tuple(&new_tuple.to_bytes()?)?;
            for index_info in &indexes {
                if let Some(key) = index_info.key_of(&new_tuple)? {
                    index_info.index.insert(key, new_rid)?;
                }
            }

            updated += 1;
        }

        self.done = true;
        Ok(Some((
            Tuple::new(
                Arc::clone(&self.output_schema),
                vec![Value::Integer(updated)],
            ),
            RecordId::invalid(),
        )))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}
