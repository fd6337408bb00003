use std::sync::Arc;

use crate::common::{RecordId, Result};
use crate::tuple::{Schema, Tuple, Value};

use super::expression::Expression;
use super::plan::JoinType;
use super::Executor;

/// Nested-loop join over a fully buffered inner (right) side. Supports
/// inner and left outer joins; a left join emits one null-padded row for
/// every outer row that matched nothing.
pub struct NestedLoopJoinExecutor {
    join_type: JoinType,
    predicate: Expression,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    output_schema: Arc<Schema>,
    /// The buffered inner side, materialized in `init`.
    inner_rows: Vec<Tuple>,
    outer_tuple: Option<Tuple>,
    inner_cursor: usize,
    outer_matched: bool,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        join_type: JoinType,
        predicate: Expression,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Self {
        let output_schema = Schema::join(left.output_schema(), right.output_schema());
        Self {
            join_type,
            predicate,
            left,
            right,
            output_schema,
            inner_rows: Vec::new(),
            outer_tuple: None,
            inner_cursor: 0,
            outer_matched: false,
        }
    }

    fn joined_row(&self, outer: &Tuple, inner: Option<&Tuple>) -> Tuple {
        let right_arity = self.right.output_schema().column_count();
        let mut values = Vec::with_capacity(self.output_schema.column_count());
        values.extend(outer.values().iter().cloned());
        match inner {
            Some(inner) => values.extend(inner.values().iter().cloned()),
            None => values.extend(std::iter::repeat(Value::Null).take(right_arity)),
        }
        Tuple::new(Arc::clone(&self.output_schema), values)
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.left.init()?;
        self.right.init()?;

        // The join is a pipeline breaker on its inner side.
        self.inner_rows.clear();
        while let Some((tuple, _)) = self.right.next()? {
            self.inner_rows.push(tuple);
        }

        self.outer_tuple = None;
        self.inner_cursor = 0;
        self.outer_matched = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        loop {
            if self.outer_tuple.is_none() {
                let Some((tuple, _)) = self.left.next()? else {
                    return Ok(None);
                };
                self.outer_tuple = Some(tuple);
                self.inner_cursor = 0;
                self.outer_matched = false;
            }
            let outer = self.outer_tuple.as_ref().unwrap();

            while self.inner_cursor < self.inner_rows.len() {
                let inner = &self.inner_rows[self.inner_cursor];
                self.inner_cursor += 1;

                if self.predicate.evaluate_join(outer, inner).is_true() {
                    self.outer_matched = true;
                    let row = self.joined_row(outer, Some(inner));
                    return Ok(Some((row, RecordId::invalid())));
                }
            }

            // Inner side exhausted for this outer row.
            if self.join_type == JoinType::Left && !self.outer_matched {
                let row = self.joined_row(outer, None);
                self.outer_tuple = None;
                return Ok(Some((row, RecordId::invalid())));
            }
            self.outer_tuple = None;
        }
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}
