use crate::catalog::Catalog;
use crate::execution::expression::{ComparisonOp, Expression};
use crate::execution::plan::PlanNode;

/// Rewrites equality-filtered sequential scans into index probes.
///
/// A `SeqScan` whose filter compares a bare column against a constant
/// with `=` becomes an `IndexScan` when a single-column index exists on
/// that column. The filter stays on the index scan as a re-check.
pub fn optimize_seq_scan_as_index_scan(plan: &PlanNode, catalog: &Catalog) -> PlanNode {
    let optimized = rewrite_children(plan, catalog);

    let PlanNode::SeqScan {
        table_oid,
        filter: Some(filter),
    } = &optimized
    else {
        return optimized;
    };

    let Some((column, pred_key)) = match_column_equals_constant(filter) else {
        return optimized;
    };

    let Some(index_info) = catalog.index_on_column(*table_oid, column) else {
        return optimized;
    };

    log::debug!(
        "rewriting seq scan of table {} into probe of index {}",
        table_oid,
        index_info.name
    );
    PlanNode::IndexScan {
        table_oid: *table_oid,
        index_oid: index_info.oid,
        pred_key,
        filter: Some(filter.clone()),
    }
}

fn rewrite_children(plan: &PlanNode, catalog: &Catalog) -> PlanNode {
    let mut plan = plan.clone();
    match &mut plan {
        PlanNode::SeqScan { .. } | PlanNode::IndexScan { .. } | PlanNode::Values { .. } => {}
        PlanNode::Insert { child, .. }
        | PlanNode::Delete { child, .. }
        | PlanNode::Update { child, .. }
        | PlanNode::Aggregation { child, .. } => {
            **child = optimize_seq_scan_as_index_scan(child, catalog);
        }
        PlanNode::NestedLoopJoin { left, right, .. } => {
            **left = optimize_seq_scan_as_index_scan(left, catalog);
            **right = optimize_seq_scan_as_index_scan(right, catalog);
        }
    }
    plan
}

/// Matches `column = constant` with the column on the left, returning
/// the column ordinal and the literal key.
fn match_column_equals_constant(
    filter: &Expression,
) -> Option<(usize, crate::tuple::Value)> {
    let Expression::Comparison {
        op: ComparisonOp::Equal,
        left,
        right,
    } = filter
    else {
        return None;
    };

    match (left.as_ref(), right.as_ref()) {
        (Expression::ColumnRef(column), Expression::Constant(value)) => {
            Some((*column, value.clone()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPoolManager;
    use crate::storage::disk::DiskManager;
    use crate::tuple::{Column, DataType, Schema, Value};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn setup() -> (Catalog, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let bpm = Arc::new(BufferPoolManager::new(64, 2, dm));
        (Catalog::new(bpm), temp_file)
    }

    #[test]
    fn test_rewrites_equality_scan_with_matching_index() {
        let (catalog, _temp) = setup();
        let schema = Schema::new(vec![Column::new("id", DataType::Integer)]);
        let table = catalog.create_table("t", schema).unwrap();
        let index = catalog.create_index("t_id", "t", "id").unwrap();

        let plan = PlanNode::SeqScan {
            table_oid: table.oid,
            filter: Some(Expression::column_equals(0, Value::Integer(7))),
        };

        let optimized = optimize_seq_scan_as_index_scan(&plan, &catalog);
        match optimized {
            PlanNode::IndexScan {
                index_oid,
                pred_key,
                filter,
                ..
            } => {
                assert_eq!(index_oid, index.oid);
                assert_eq!(pred_key, Value::Integer(7));
                assert!(filter.is_some());
            }
            other => panic!("expected IndexScan, got {:?}", other),
        }
    }

    #[test]
    fn test_constant_on_the_left_not_rewritten() {
        let (catalog, _temp) = setup();
        let schema = Schema::new(vec![Column::new("id", DataType::Integer)]);
        let table = catalog.create_table("t", schema).unwrap();
        catalog.create_index("t_id", "t", "id").unwrap();

        // Only the column-on-the-left shape is recognized.
        let plan = PlanNode::SeqScan {
            table_oid: table.oid,
            filter: Some(Expression::comparison(
                ComparisonOp::Equal,
                Expression::Constant(Value::Integer(7)),
                Expression::ColumnRef(0),
            )),
        };

        assert!(matches!(
            optimize_seq_scan_as_index_scan(&plan, &catalog),
            PlanNode::SeqScan { .. }
        ));
    }

    #[test]
    fn test_no_index_leaves_plan_alone() {
        let (catalog, _temp) = setup();
        let schema = Schema::new(vec![Column::new("id", DataType::Integer)]);
        let table = catalog.create_table("t", schema).unwrap();

        let plan = PlanNode::SeqScan {
            table_oid: table.oid,
            filter: Some(Expression::column_equals(0, Value::Integer(7))),
        };

        assert!(matches!(
            optimize_seq_scan_as_index_scan(&plan, &catalog),
            PlanNode::SeqScan { .. }
        ));
    }

    #[test]
    fn test_non_equality_filter_not_rewritten() {
        let (catalog, _temp) = setup();
        let schema = Schema::new(vec![Column::new("id", DataType::Integer)]);
        let table = catalog.create_table("t", schema).unwrap();
        catalog.create_index("t_id", "t", "id").unwrap();

        let plan = PlanNode::SeqScan {
            table_oid: table.oid,
            filter: Some(Expression::comparison(
                ComparisonOp::LessThan,
                Expression::ColumnRef(0),
                Expression::Constant(Value::Integer(7)),
            )),
        };

        assert!(matches!(
            optimize_seq_scan_as_index_scan(&plan, &catalog),
            PlanNode::SeqScan { .. }
        ));
    }

    #[test]
    fn test_rewrite_descends_into_children() {
        let (catalog, _temp) = setup();
        let schema = Schema::new(vec![Column::new("id", DataType::Integer)]);
        let table = catalog.create_table("t", schema).unwrap();
        catalog.create_index("t_id", "t", "id").unwrap();

        let plan = PlanNode::Aggregation {
            group_bys: vec![],
            aggregates: vec![],
            child: Box::new(PlanNode::SeqScan {
                table_oid: table.oid,
                filter: Some(Expression::column_equals(0, Value::Integer(1))),
            }),
        };

        let PlanNode::Aggregation { child, .. } = optimize_seq_scan_as_index_scan(&plan, &catalog)
        else {
            panic!("aggregation root expected");
        };
        assert!(matches!(*child, PlanNode::IndexScan { .. }));
    }
}
