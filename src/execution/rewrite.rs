//! Rule-based plan rewrites. Each rule pattern-matches on the `PlanNode`
//! tag directly — no downcasting — and, when it fires, splices in a
//! semantically equivalent replacement. Rewrites recurse bottom-up so a
//! rewrite applied to a child is visible to the rule examining its parent.

use crate::execution::expr::{split_equi_join_conjunction, Expr};
use crate::execution::plan::PlanNode;

/// Applies the rewrites that don't need catalog access, bottom-up:
/// NLJ->HashJoin and Sort+Limit->TopN. `SeqScan->IndexScan` additionally
/// needs to know which columns have an index, so it lives in
/// `optimize_with_index_lookup` instead.
pub fn optimize(plan: PlanNode) -> PlanNode {
    let plan = recurse(plan);
    let plan = rewrite_nlj_to_hash_join(plan);
    rewrite_sort_limit_to_topn(plan)
}

/// Like [`optimize`], but also applies `SeqScan->IndexScan` using
/// `lookup(table_oid) -> Some((index_oid, column_index))` for the table's
/// single-column index, if any.
pub fn optimize_with_index_lookup(plan: PlanNode, lookup: &impl Fn(u32) -> Option<(u32, usize)>) -> PlanNode {
    let plan = recurse_with_index_lookup(plan, lookup);
    let plan = try_seq_scan_to_index_scan(plan, lookup);
    let plan = rewrite_nlj_to_hash_join(plan);
    rewrite_sort_limit_to_topn(plan)
}

fn recurse_with_index_lookup(plan: PlanNode, lookup: &impl Fn(u32) -> Option<(u32, usize)>) -> PlanNode {
    match plan {
        PlanNode::Insert { schema, table_oid, child } => PlanNode::Insert {
            schema,
            table_oid,
            child: Box::new(optimize_with_index_lookup(*child, lookup)),
        },
        PlanNode::Update {
            schema,
            table_oid,
            target_exprs,
            child,
        } => PlanNode::Update {
            schema,
            table_oid,
            target_exprs,
            child: Box::new(optimize_with_index_lookup(*child, lookup)),
        },
        PlanNode::Delete { schema, table_oid, child } => PlanNode::Delete {
            schema,
            table_oid,
            child: Box::new(optimize_with_index_lookup(*child, lookup)),
        },
        PlanNode::NestedLoopJoin {
            schema,
            join_type,
            predicate,
            left,
            right,
        } => PlanNode::NestedLoopJoin {
            schema,
            join_type,
            predicate,
            left: Box::new(optimize_with_index_lookup(*left, lookup)),
            right: Box::new(optimize_with_index_lookup(*right, lookup)),
        },
        PlanNode::Aggregation {
            schema,
            group_by,
            aggregates,
            child,
        } => PlanNode::Aggregation {
            schema,
            group_by,
            aggregates,
            child: Box::new(optimize_with_index_lookup(*child, lookup)),
        },
        PlanNode::Sort { schema, order_bys, child } => PlanNode::Sort {
            schema,
            order_bys,
            child: Box::new(optimize_with_index_lookup(*child, lookup)),
        },
        PlanNode::Limit { schema, limit, child } => PlanNode::Limit {
            schema,
            limit,
            child: Box::new(optimize_with_index_lookup(*child, lookup)),
        },
        PlanNode::TopN {
            schema,
            order_bys,
            n,
            child,
        } => PlanNode::TopN {
            schema,
            order_bys,
            n,
            child: Box::new(optimize_with_index_lookup(*child, lookup)),
        },
        PlanNode::Window {
            schema,
            partition_by,
            order_bys,
            func,
            arg,
            child,
        } => PlanNode::Window {
            schema,
            partition_by,
            order_bys,
            func,
            arg,
            child: Box::new(optimize_with_index_lookup(*child, lookup)),
        },
        leaf @ PlanNode::SeqScan { .. } => try_seq_scan_to_index_scan(leaf, lookup),
        leaf @ (PlanNode::Values { .. } | PlanNode::IndexScan { .. }) => leaf,
        PlanNode::HashJoin {
            schema,
            join_type,
            left_keys,
            right_keys,
            left,
            right,
        } => PlanNode::HashJoin {
            schema,
            join_type,
            left_keys,
            right_keys,
            left: Box::new(optimize_with_index_lookup(*left, lookup)),
            right: Box::new(optimize_with_index_lookup(*right, lookup)),
        },
    }
}

fn recurse(plan: PlanNode) -> PlanNode {
    match plan {
        PlanNode::Insert { schema, table_oid, child } => PlanNode::Insert {
            schema,
            table_oid,
            child: Box::new(optimize(*child)),
        },
        PlanNode::Update {
            schema,
            table_oid,
            target_exprs,
            child,
        } => PlanNode::Update {
            schema,
            table_oid,
            target_exprs,
            child: Box::new(optimize(*child)),
        },
        PlanNode::Delete { schema, table_oid, child } => PlanNode::Delete {
            schema,
            table_oid,
            child: Box::new(optimize(*child)),
        },
        PlanNode::NestedLoopJoin {
            schema,
            join_type,
            predicate,
            left,
            right,
        } => PlanNode::NestedLoopJoin {
            schema,
            join_type,
            predicate,
            left: Box::new(optimize(*left)),
            right: Box::new(optimize(*right)),
        },
        PlanNode::HashJoin {
            schema,
            join_type,
            left_keys,
            right_keys,
            left,
            right,
        } => PlanNode::HashJoin {
            schema,
            join_type,
            left_keys,
            right_keys,
            left: Box::new(optimize(*left)),
            right: Box::new(optimize(*right)),
        },
        PlanNode::Aggregation {
            schema,
            group_by,
            aggregates,
            child,
        } => PlanNode::Aggregation {
            schema,
            group_by,
            aggregates,
            child: Box::new(optimize(*child)),
        },
        PlanNode::Sort { schema, order_bys, child } => PlanNode::Sort {
            schema,
            order_bys,
            child: Box::new(optimize(*child)),
        },
        PlanNode::Limit { schema, limit, child } => PlanNode::Limit {
            schema,
            limit,
            child: Box::new(optimize(*child)),
        },
        PlanNode::TopN {
            schema,
            order_bys,
            n,
            child,
        } => PlanNode::TopN {
            schema,
            order_bys,
            n,
            child: Box::new(optimize(*child)),
        },
        PlanNode::Window {
            schema,
            partition_by,
            order_bys,
            func,
            arg,
            child,
        } => PlanNode::Window {
            schema,
            partition_by,
            order_bys,
            func,
            arg,
            child: Box::new(optimize(*child)),
        },
        leaf @ (PlanNode::Values { .. } | PlanNode::SeqScan { .. } | PlanNode::IndexScan { .. }) => leaf,
    }
}

/// `SeqScan` over a single `col = const` predicate rewrites to `IndexScan`
/// when an index exists over exactly that column. The caller (catalog
/// lookup) is threaded in as a closure so this module stays independent of
/// the catalog's concrete type. Given a `SeqScan`'s column index and a lookup from column index to
/// index oid, returns the replacement `IndexScan` plan, or the original
/// `SeqScan` unchanged if no matching index or predicate shape exists.
/// Exposed for callers that have catalog access at plan-build time; the
/// bare `optimize` pass above does not invoke this because it has none.
pub fn try_seq_scan_to_index_scan(
    plan: PlanNode,
    lookup: impl Fn(u32) -> Option<(u32, usize)>,
) -> PlanNode {
    match &plan {
        PlanNode::SeqScan {
            schema,
            table_oid,
            filter: Some(Expr::Compare(crate::execution::expr::CmpOp::Eq, l, r)),
        } => {
            let (col_idx, probe_key) = match (l.as_ref(), r.as_ref()) {
                (Expr::Column(idx), Expr::Literal(v)) => (*idx, v.clone()),
                (Expr::Literal(v), Expr::Column(idx)) => (*idx, v.clone()),
                _ => return plan,
            };
            if let Some((index_oid, index_col)) = lookup(*table_oid) {
                if index_col == col_idx {
                    return PlanNode::IndexScan {
                        schema: schema.clone(),
                        table_oid: *table_oid,
                        index_oid,
                        probe_key,
                        filter: None,
                    };
                }
            }
            plan
        }
        _ => plan,
    }
}

/// `NestedLoopJoin` over a conjunction of per-side column equalities
/// rewrites to `HashJoin`, which builds a hash table over the left side
/// instead of rescanning the right child once per left tuple.
pub fn rewrite_nlj_to_hash_join(plan: PlanNode) -> PlanNode {
    match plan {
        PlanNode::NestedLoopJoin {
            schema,
            join_type,
            predicate,
            left,
            right,
        } => match split_equi_join_conjunction(&predicate) {
            Some((left_keys, right_keys)) => PlanNode::HashJoin {
                schema,
                join_type,
                left_keys,
                right_keys,
                left,
                right,
            },
            None => PlanNode::NestedLoopJoin {
                schema,
                join_type,
                predicate,
                left,
                right,
            },
        },
        other => other,
    }
}

/// `Limit(n)` directly over `Sort(order_bys)` rewrites to `TopN(order_bys,
/// n)`, which never materializes more than `n` candidate rows instead of
/// sorting the whole input and then truncating it.
pub fn rewrite_sort_limit_to_topn(plan: PlanNode) -> PlanNode {
    match plan {
        PlanNode::Limit { schema, limit, child } => match *child {
            PlanNode::Sort { order_bys, child, .. } => PlanNode::TopN {
                schema,
                order_bys,
                n: limit,
                child,
            },
            other => PlanNode::Limit {
                schema,
                limit,
                child: Box::new(other),
            },
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType, Schema};
    use crate::execution::expr::{CmpOp, JoinSide};
    use crate::execution::plan::{JoinType, OrderByType};
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![Column::new("a", DataType::Integer)]))
    }

    #[test]
    fn sort_limit_becomes_topn() {
        let plan = PlanNode::Limit {
            schema: schema(),
            limit: 5,
            child: Box::new(PlanNode::Sort {
                schema: schema(),
                order_bys: vec![(OrderByType::Asc, Expr::column(0))],
                child: Box::new(PlanNode::SeqScan {
                    schema: schema(),
                    table_oid: 0,
                    filter: None,
                }),
            }),
        };
        let rewritten = rewrite_sort_limit_to_topn(plan);
        assert!(matches!(rewritten, PlanNode::TopN { n: 5, .. }));
    }

    #[test]
    fn equi_nlj_becomes_hash_join() {
        let predicate = Expr::eq(Expr::JoinColumn(JoinSide::Left, 0), Expr::JoinColumn(JoinSide::Right, 0));
        let plan = PlanNode::NestedLoopJoin {
            schema: schema(),
            join_type: JoinType::Inner,
            predicate,
            left: Box::new(PlanNode::SeqScan {
                schema: schema(),
                table_oid: 0,
                filter: None,
            }),
            right: Box::new(PlanNode::SeqScan {
                schema: schema(),
                table_oid: 1,
                filter: None,
            }),
        };
        let rewritten = rewrite_nlj_to_hash_join(plan);
        assert!(matches!(rewritten, PlanNode::HashJoin { .. }));
    }

    #[test]
    fn non_equi_nlj_is_left_alone() {
        let predicate = Expr::Compare(
            CmpOp::Lt,
            Box::new(Expr::JoinColumn(JoinSide::Left, 0)),
            Box::new(Expr::JoinColumn(JoinSide::Right, 0)),
        );
        let plan = PlanNode::NestedLoopJoin {
            schema: schema(),
            join_type: JoinType::Inner,
            predicate,
            left: Box::new(PlanNode::SeqScan {
                schema: schema(),
                table_oid: 0,
                filter: None,
            }),
            right: Box::new(PlanNode::SeqScan {
                schema: schema(),
                table_oid: 1,
                filter: None,
            }),
        };
        let rewritten = rewrite_nlj_to_hash_join(plan);
        assert!(matches!(rewritten, PlanNode::NestedLoopJoin { .. }));
    }
}
