mod aggregation_executor;
mod delete_executor;
mod executor;
pub mod expression;
mod index_scan_executor;
mod insert_executor;
mod nested_loop_join_executor;
pub mod plan;
mod seq_scan_executor;
mod update_executor;
mod values_executor;

use std::sync::Arc;

use crate::common::{Result, RookError};
use crate::tuple::{Column, DataType, Schema};

pub use aggregation_executor::AggregationExecutor;
pub use delete_executor::DeleteExecutor;
pub use executor::{Executor, ExecutorContext};
pub use expression::{ComparisonOp, Expression};
pub use index_scan_executor::IndexScanExecutor;
pub use insert_executor::InsertExecutor;
pub use nested_loop_join_executor::NestedLoopJoinExecutor;
pub use plan::{AggregateExpr, AggregationType, JoinType, PlanNode};
pub use seq_scan_executor::SeqScanExecutor;
pub use update_executor::UpdateExecutor;
pub use values_executor::ValuesExecutor;

/// Output schema shared by the DML executors: a single integer count.
pub(crate) fn dml_output_schema() -> Arc<Schema> {
    Schema::new(vec![Column::new("rows_affected", DataType::Integer)])
}

/// Builds the executor tree for a plan. Children are built first so the
/// parents can derive their output schemas.
pub fn build_executor(plan: &PlanNode, ctx: &Arc<ExecutorContext>) -> Result<Box<dyn Executor>> {
    let table_of = |oid: u32| {
        ctx.catalog
            .table(oid)
            .ok_or(RookError::TableNotFound(oid))
    };

    match plan {
        PlanNode::SeqScan { table_oid, filter } => Ok(Box::new(SeqScanExecutor::new(
            table_of(*table_oid)?,
            filter.clone(),
        ))),
        PlanNode::IndexScan {
            table_oid,
            index_oid,
            pred_key,
            filter,
        } => {
            let index = ctx
                .catalog
                .index(*index_oid)
                .ok_or(RookError::IndexNotFound(*index_oid))?;
            Ok(Box::new(IndexScanExecutor::new(
                table_of(*table_oid)?,
                index,
                pred_key.clone(),
                filter.clone(),
            )))
        }
        PlanNode::Values { schema, rows } => Ok(Box::new(ValuesExecutor::new(
            Arc::clone(schema),
            rows.clone(),
        ))),
        PlanNode::Insert { table_oid, child } => Ok(Box::new(InsertExecutor::new(
            Arc::clone(ctx),
            table_of(*table_oid)?,
            build_executor(child, ctx)?,
        ))),
        PlanNode::Delete { table_oid, child } => Ok(Box::new(DeleteExecutor::new(
            Arc::clone(ctx),
            table_of(*table_oid)?,
            build_executor(child, ctx)?,
        ))),
        PlanNode::Update {
            table_oid,
            target_values,
            child,
        } => Ok(Box::new(UpdateExecutor::new(
            Arc::clone(ctx),
            table_of(*table_oid)?,
            target_values.clone(),
            build_executor(child, ctx)?,
        ))),
        PlanNode::NestedLoopJoin {
            join_type,
            predicate,
            left,
            right,
        } => Ok(Box::new(NestedLoopJoinExecutor::new(
            *join_type,
            predicate.clone(),
            build_executor(left, ctx)?,
            build_executor(right, ctx)?,
        ))),
        PlanNode::Aggregation {
            group_bys,
            aggregates,
            child,
        } => Ok(Box::new(AggregationExecutor::new(
            group_bys.clone(),
            aggregates.clone(),
            build_executor(child, ctx)?,
        ))),
    }
}
