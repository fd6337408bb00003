use std::cmp::Ordering;

use crate::tuple::{Tuple, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOp {
    fn admits(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::LessThanOrEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }
}

/// Scalar expressions over tuples. A closed enum: the planner and the
/// optimizer pattern-match on the variants directly.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A column of the input tuple, by ordinal. In a join context,
    /// ordinals at or past the left arity address the right tuple.
    ColumnRef(usize),
    Constant(Value),
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn column(index: usize) -> Expression {
        Expression::ColumnRef(index)
    }

    pub fn constant(value: Value) -> Expression {
        Expression::Constant(value)
    }

    pub fn comparison(op: ComparisonOp, left: Expression, right: Expression) -> Expression {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Shorthand for the equality filters the optimizer recognizes.
    pub fn column_equals(column: usize, value: Value) -> Expression {
        Self::comparison(
            ComparisonOp::Equal,
            Expression::ColumnRef(column),
            Expression::Constant(value),
        )
    }

    pub fn evaluate(&self, tuple: &Tuple) -> Value {
        match self {
            Expression::ColumnRef(index) => tuple
                .value(*index)
                .cloned()
                .unwrap_or(Value::Null),
            Expression::Constant(value) => value.clone(),
            Expression::Comparison { op, left, right } => {
                Self::compare(op, left.evaluate(tuple), right.evaluate(tuple))
            }
            Expression::And(left, right) => {
                Self::logical_and(left.evaluate(tuple), right.evaluate(tuple))
            }
            Expression::Or(left, right) => {
                Self::logical_or(left.evaluate(tuple), right.evaluate(tuple))
            }
        }
    }

    /// Evaluation over a joined row without materializing it: column
    /// ordinals past the left tuple's arity index into the right tuple.
    pub fn evaluate_join(&self, left_tuple: &Tuple, right_tuple: &Tuple) -> Value {
        match self {
            Expression::ColumnRef(index) => {
                let left_arity = left_tuple.schema().column_count();
                let value = if *index < left_arity {
                    left_tuple.value(*index)
                } else {
                    right_tuple.value(*index - left_arity)
                };
                value.cloned().unwrap_or(Value::Null)
            }
            Expression::Constant(value) => value.clone(),
            Expression::Comparison { op, left, right } => Self::compare(
                op,
                left.evaluate_join(left_tuple, right_tuple),
                right.evaluate_join(left_tuple, right_tuple),
            ),
            Expression::And(left, right) => Self::logical_and(
                left.evaluate_join(left_tuple, right_tuple),
                right.evaluate_join(left_tuple, right_tuple),
            ),
            Expression::Or(left, right) => Self::logical_or(
                left.evaluate_join(left_tuple, right_tuple),
                right.evaluate_join(left_tuple, right_tuple),
            ),
        }
    }

    fn compare(op: &ComparisonOp, left: Value, right: Value) -> Value {
        match left.compare(&right) {
            Some(ordering) => Value::Boolean(op.admits(ordering)),
            None => Value::Null,
        }
    }

    fn logical_and(left: Value, right: Value) -> Value {
        match (left, right) {
            (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(a && b),
            // False dominates an unknown operand.
            (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Value::Boolean(false),
            _ => Value::Null,
        }
    }

    fn logical_or(left: Value, right: Value) -> Value {
        match (left, right) {
            (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(a || b),
            (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Value::Boolean(true),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{Column, DataType, Schema};
    use std::sync::Arc;

    fn row(values: Vec<Value>) -> Tuple {
        let columns = (0..values.len())
            .map(|i| Column::new(format!("c{}", i), DataType::Integer))
            .collect();
        Tuple::new(Schema::new(columns), values)
    }

    #[test]
    fn test_equality_on_column() {
        let expr = Expression::column_equals(0, Value::Integer(5));

        assert!(expr.evaluate(&row(vec![Value::Integer(5)])).is_true());
        assert!(!expr.evaluate(&row(vec![Value::Integer(6)])).is_true());
        // Null input compares to Null, which is not true.
        assert!(!expr.evaluate(&row(vec![Value::Null])).is_true());
    }

    #[test]
    fn test_join_column_addressing() {
        let expr = Expression::comparison(
            ComparisonOp::Equal,
            Expression::ColumnRef(0),
            Expression::ColumnRef(1),
        );

        let left = row(vec![Value::Integer(3)]);
        let right = row(vec![Value::Integer(3)]);
        assert!(expr.evaluate_join(&left, &right).is_true());

        let right = row(vec![Value::Integer(4)]);
        assert!(!expr.evaluate_join(&left, &right).is_true());
    }

    #[test]
    fn test_three_valued_and() {
        let null = Expression::Constant(Value::Null);
        let true_ = Expression::Constant(Value::Boolean(true));
        let false_ = Expression::Constant(Value::Boolean(false));
        let dummy = row(vec![]);

        let and = |a: &Expression, b: &Expression| {
            Expression::And(Box::new(a.clone()), Box::new(b.clone())).evaluate(&dummy)
        };
        assert_eq!(and(&null, &true_), Value::Null);
        assert_eq!(and(&null, &false_), Value::Boolean(false));
        assert_eq!(and(&true_, &true_), Value::Boolean(true));
    }
}
