use std::sync::Arc;

use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple, Value};

use super::Executor;

/// Emits a fixed list of literal rows; the usual source under DML plans.
pub struct ValuesExecutor {
    schema: Arc<Schema>,
    rows: Vec<Vec<Value>>,
    cursor: usize,
}

impl ValuesExecutor {
    pub fn new(schema: Arc<Schema>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            schema,
            rows,
            cursor: 0,
        }
    }
}

impl Executor for ValuesExecutor {
    fn init(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let Some(row) = self.rows.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some((
            Tuple::new(Arc::clone(&self.schema), row.clone()),
            RecordId::invalid(),
        )))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
