use std::sync::Arc;

use crate::catalog::{IndexOid, TableOid};
use crate::tuple::{Schema, Value};

use super::expression::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    CountStar,
    Count,
    Sum,
    Min,
    Max,
}

/// One aggregate in an aggregation plan: what to compute over which
/// input expression. `CountStar` ignores its input.
#[derive(Debug, Clone)]
pub struct AggregateExpr {
    pub kind: AggregationType,
    pub input: Expression,
}

/// Query plans as a closed tree of variants. Executors are built from
/// these by [`super::build_executor`]; the optimizer rewrites them
/// structurally.
#[derive(Debug, Clone)]
pub enum PlanNode {
    /// Full heap walk with an optional residual filter.
    SeqScan {
        table_oid: TableOid,
        filter: Option<Expression>,
    },
    /// Single index probe with the literal key, filter re-checked.
    IndexScan {
        table_oid: TableOid,
        index_oid: IndexOid,
        pred_key: Value,
        filter: Option<Expression>,
    },
    /// Literal rows, the source feeding DML statements.
    Values {
        schema: Arc<Schema>,
        rows: Vec<Vec<Value>>,
    },
    Insert {
        table_oid: TableOid,
        child: Box<PlanNode>,
    },
    Delete {
        table_oid: TableOid,
        child: Box<PlanNode>,
    },
    /// Delete-then-insert update; `target_values` produce the new row
    /// from the old one, in table schema order.
    Update {
        table_oid: TableOid,
        target_values: Vec<Expression>,
        child: Box<PlanNode>,
    },
    NestedLoopJoin {
        join_type: JoinType,
        predicate: Expression,
        left: Box<PlanNode>,
        right: Box<PlanNode>,
    },
    Aggregation {
        group_bys: Vec<Expression>,
        aggregates: Vec<AggregateExpr>,
        child: Box<PlanNode>,
    },
}

impl PlanNode {
    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            PlanNode::SeqScan { .. } | PlanNode::IndexScan { .. } | PlanNode::Values { .. } => {
                Vec::new()
            }
            PlanNode::Insert { child, .. }
            | PlanNode::Delete { child, .. }
            | PlanNode::Update { child, .. }
            | PlanNode::Aggregation { child, .. } => vec![child],
            PlanNode::NestedLoopJoin { left, right, .. } => vec![left, right],
        }
    }
}
