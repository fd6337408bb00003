use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{RecordId, Result};
use crate::tuple::{Column, DataType, Schema, Tuple, Value};

use super::expression::Expression;
use super::plan::{AggregateExpr, AggregationType};
use super::Executor;

/// Hash aggregation. A pipeline breaker: `init` drains the child into a
/// hash table from group-by keys to running aggregate state, `next`
/// enumerates the finished groups.
///
/// With no group-by clause and an empty child, exactly one row of
/// initial aggregate values is emitted (COUNT = 0, SUM/MIN/MAX = NULL).
pub struct AggregationExecutor {
    group_bys: Vec<Expression>,
    aggregates: Vec<AggregateExpr>,
    child: Box<dyn Executor>,
    output_schema: Arc<Schema>,
    results: Vec<(Vec<Value>, Vec<Value>)>,
    cursor: usize,
}

impl AggregationExecutor {
    pub fn new(
        group_bys: Vec<Expression>,
        aggregates: Vec<AggregateExpr>,
        child: Box<dyn Executor>,
    ) -> Self {
        let output_schema = Self::build_output_schema(&group_bys, &aggregates, child.as_ref());
        Self {
            group_bys,
            aggregates,
            child,
            output_schema,
            results: Vec::new(),
            cursor: 0,
        }
    }

    /// Group columns keep the child's name and type where the expression
    /// is a plain column; everything else gets a positional name.
    fn build_output_schema(
        group_bys: &[Expression],
        aggregates: &[AggregateExpr],
        child: &dyn Executor,
    ) -> Arc<Schema> {
        let child_schema = child.output_schema();
        let mut columns = Vec::with_capacity(group_bys.len() + aggregates.len());

        for (i, expr) in group_bys.iter().enumerate() {
            let column = match expr {
                Expression::ColumnRef(idx) => child_schema
                    .column(*idx)
                    .map(|c| Column::new(c.name(), *c.data_type())),
                _ => None,
            };
            columns.push(column.unwrap_or_else(|| Column::new(format!("group_{}", i), DataType::Integer)));
        }
        for (i, _) in aggregates.iter().enumerate() {
            columns.push(Column::new(format!("agg_{}", i), DataType::Integer));
        }
        Schema::new(columns)
    }

    fn initial_aggregate_values(&self) -> Vec<Value> {
        self.aggregates
            .iter()
            .map(|agg| match agg.kind {
                AggregationType::CountStar | AggregationType::Count => Value::Integer(0),
                AggregationType::Sum | AggregationType::Min | AggregationType::Max => Value::Null,
            })
            .collect()
    }

    fn combine(state: &mut Value, kind: AggregationType, input: Value) {
        match kind {
            AggregationType::CountStar => {
                if let Value::Integer(n) = state {
                    *n += 1;
                }
            }
            AggregationType::Count => {
                if !input.is_null() {
                    if let Value::Integer(n) = state {
                        *n += 1;
                    }
                }
            }
            AggregationType::Sum => {
                if input.is_null() {
                    return;
                }
                *state = match (&*state, &input) {
                    (Value::Null, _) => input,
                    (Value::Integer(a), Value::Integer(b)) => Value::Integer(a + b),
                    (Value::BigInt(a), Value::BigInt(b)) => Value::BigInt(a + b),
                    (Value::Integer(a), Value::BigInt(b)) => Value::BigInt(*a as i64 + b),
                    (Value::BigInt(a), Value::Integer(b)) => Value::BigInt(a + *b as i64),
                    (other, _) => other.clone(),
                };
            }
            AggregationType::Min => {
                if input.is_null() {
                    return;
                }
                let replace = match state.compare(&input) {
                    Some(ordering) => ordering.is_gt(),
                    None => state.is_null(),
                };
                if replace {
                    *state = input;
                }
            }
            AggregationType::Max => {
                if input.is_null() {
                    return;
                }
                let replace = match state.compare(&input) {
                    Some(ordering) => ordering.is_lt(),
                    None => state.is_null(),
                };
                if replace {
                    *state = input;
                }
            }
        }
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;
        self.results.clear();
        self.cursor = 0;

        let mut table: HashMap<Vec<Value>, Vec<Value>> = HashMap::new();

        while let Some((tuple, _)) = self.child.next()? {
            let key: Vec<Value> = self
                .group_bys
                .iter()
                .map(|expr| expr.evaluate(&tuple))
                .collect();
            let state = table
                .entry(key)
                .or_insert_with(|| self.initial_aggregate_values());
            for (i, agg) in self.aggregates.iter().enumerate() {
                let input = match agg.kind {
                    AggregationType::CountStar => Value::Null,
                    _ => agg.input.evaluate(&tuple),
                };
                Self::combine(&mut state[i], agg.kind, input);
            }
        }

        if table.is_empty() && self.group_bys.is_empty() {
            self.results.push((Vec::new(), self.initial_aggregate_values()));
        } else {
            self.results.extend(table);
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let Some((group, aggregates)) = self.results.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;

        let mut values = Vec::with_capacity(group.len() + aggregates.len());
        values.extend(group.iter().cloned());
        values.extend(aggregates.iter().cloned());

        Ok(Some((
            Tuple::new(Arc::clone(&self.output_schema), values),
            RecordId::invalid(),
        )))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}
