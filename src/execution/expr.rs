//! The expression evaluator the execution operators are built against.
//!
//! The design treats expression evaluation as an external black box
//! (`Evaluate(tuple, schema) -> Value`, `EvaluateJoin(lt, ls, rt, rs) ->
//! Value`, three-valued comparison); this is a small concrete stand-in with
//! just enough shape — column references, literals, comparisons, and
//! boolean connectives — to drive scans, joins, predicates, and sort/group
//! keys.

use crate::catalog::Schema;
use crate::common::{Tuple, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

/// A tagged expression tree. Rewrites and operators pattern-match on the
/// tag directly rather than downcasting.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    /// A column of the evaluating tuple's own schema.
    Column(usize),
    /// A column on one specific side of a join, for use only in join
    /// predicates and join keys (before the two sides' schemas combine).
    JoinColumn(JoinSide, usize),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn column(idx: usize) -> Self {
        Expr::Column(idx)
    }

    pub fn literal(v: Value) -> Self {
        Expr::Literal(v)
    }

    pub fn eq(l: Expr, r: Expr) -> Self {
        Expr::Compare(CmpOp::Eq, Box::new(l), Box::new(r))
    }

    /// Evaluates against a single tuple/schema pair (scan filters, sort
    /// keys, group-by keys, projection targets).
    pub fn evaluate(&self, tuple: &Tuple, schema: &Schema) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Column(idx) => tuple[*idx].clone(),
            Expr::JoinColumn(_, idx) => tuple[*idx].clone(),
            Expr::Compare(op, l, r) => {
                compare(*op, l.evaluate(tuple, schema), r.evaluate(tuple, schema))
            }
            Expr::And(terms) => and_all(terms.iter().map(|t| t.evaluate(tuple, schema))),
            Expr::Or(terms) => or_all(terms.iter().map(|t| t.evaluate(tuple, schema))),
        }
    }

    /// Evaluates against a left/right tuple pair before the join combines
    /// their schemas. `Column` is treated as addressing the left side, the
    /// same convention bustub-style join predicates use for an
    /// un-qualified reference.
    pub fn evaluate_join(&self, lt: &Tuple, ls: &Schema, rt: &Tuple, rs: &Schema) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Column(idx) => lt[*idx].clone(),
            Expr::JoinColumn(JoinSide::Left, idx) => lt[*idx].clone(),
            Expr::JoinColumn(JoinSide::Right, idx) => rt[*idx].clone(),
            Expr::Compare(op, l, r) => compare(
                *op,
                l.evaluate_join(lt, ls, rt, rs),
                r.evaluate_join(lt, ls, rt, rs),
            ),
            Expr::And(terms) => and_all(terms.iter().map(|t| t.evaluate_join(lt, ls, rt, rs))),
            Expr::Or(terms) => or_all(terms.iter().map(|t| t.evaluate_join(lt, ls, rt, rs))),
        }
    }

    pub fn is_true(v: &Value) -> bool {
        matches!(v, Value::Boolean(true))
    }
}

fn compare(op: CmpOp, l: Value, r: Value) -> Value {
    if l.is_null() || r.is_null() {
        return Value::Null;
    }
    let Some(ord) = l.partial_cmp(&r) else {
        return Value::Null;
    };
    use std::cmp::Ordering::*;
    let result = match op {
        CmpOp::Eq => ord == Equal,
        CmpOp::Ne => ord != Equal,
        CmpOp::Lt => ord == Less,
        CmpOp::Le => ord != Greater,
        CmpOp::Gt => ord == Greater,
        CmpOp::Ge => ord != Less,
    };
    Value::Boolean(result)
}

/// Three-valued AND: `Null` unless every term is known and `True`; `False`
/// short-circuits the whole thing regardless of the remaining terms.
fn and_all(mut values: impl Iterator<Item = Value>) -> Value {
    let mut saw_null = false;
    for v in &mut values {
        match v {
            Value::Boolean(false) => return Value::Boolean(false),
            Value::Null => saw_null = true,
            _ => {}
        }
    }
    if saw_null {
        Value::Null
    } else {
        Value::Boolean(true)
    }
}

fn or_all(mut values: impl Iterator<Item = Value>) -> Value {
    let mut saw_null = false;
    for v in &mut values {
        match v {
            Value::Boolean(true) => return Value::Boolean(true),
            Value::Null => saw_null = true,
            _ => {}
        }
    }
    if saw_null {
        Value::Null
    } else {
        Value::Boolean(false)
    }
}

/// Recursively splits a conjunction of `col@0 = col@1` equalities into
/// left/right key expression vectors, the precondition the NLJ->HashJoin
/// rewrite checks for. `None` if any conjunct isn't such an equality.
pub fn split_equi_join_conjunction(expr: &Expr) -> Option<(Vec<Expr>, Vec<Expr>)> {
    let mut left_keys = Vec::new();
    let mut right_keys = Vec::new();
    if !collect_equalities(expr, &mut left_keys, &mut right_keys) {
        return None;
    }
    Some((left_keys, right_keys))
}

fn collect_equalities(expr: &Expr, left_keys: &mut Vec<Expr>, right_keys: &mut Vec<Expr>) -> bool {
    match expr {
        Expr::And(terms) => terms.iter().all(|t| collect_equalities(t, left_keys, right_keys)),
        Expr::Compare(CmpOp::Eq, l, r) => match (l.as_ref(), r.as_ref()) {
            (Expr::JoinColumn(JoinSide::Left, _), Expr::JoinColumn(JoinSide::Right, _)) => {
                left_keys.push((**l).clone());
                right_keys.push((**r).clone());
                true
            }
            (Expr::JoinColumn(JoinSide::Right, _), Expr::JoinColumn(JoinSide::Left, _)) => {
                left_keys.push((**r).clone());
                right_keys.push((**l).clone());
                true
            }
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_is_three_valued() {
        assert_eq!(
            and_all([Value::Boolean(true), Value::Null].into_iter()),
            Value::Null
        );
        assert_eq!(
            and_all([Value::Boolean(true), Value::Boolean(false), Value::Null].into_iter()),
            Value::Boolean(false)
        );
    }

    #[test]
    fn splits_equi_join_conjunction() {
        let expr = Expr::And(vec![
            Expr::eq(Expr::JoinColumn(JoinSide::Left, 0), Expr::JoinColumn(JoinSide::Right, 1)),
            Expr::eq(Expr::JoinColumn(JoinSide::Right, 0), Expr::JoinColumn(JoinSide::Left, 2)),
        ]);
        let (left, right) = split_equi_join_conjunction(&expr).unwrap();
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);
    }

    #[test]
    fn non_equi_predicate_does_not_split() {
        let expr = Expr::Compare(
            CmpOp::Lt,
            Box::new(Expr::JoinColumn(JoinSide::Left, 0)),
            Box::new(Expr::JoinColumn(JoinSide::Right, 0)),
        );
        assert!(split_equi_join_conjunction(&expr).is_none());
    }
}
