//! Plan nodes: a tagged sum type describing a query's shape. Rewrites in
//! [`crate::execution::rewrite`] pattern-match on the tag and splice in a
//! replacement node rather than doing any runtime downcasting.

use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::{IndexOid, TableOid, Tuple, Value};
use crate::execution::expr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByType {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    CountStar,
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

#[derive(Debug, Clone)]
pub struct AggregateExpr {
    pub func: AggregateFunc,
    /// `None` only for `CountStar`.
    pub arg: Option<Expr>,
}

pub type OrderBy = (OrderByType, Expr);

#[derive(Debug, Clone)]
pub enum PlanNode {
    /// A literal row source; used to feed `Insert` with constant rows and
    /// handy for tests that don't need a real table underneath a scan.
    Values {
        schema: Arc<Schema>,
        rows: Vec<Tuple>,
    },
    SeqScan {
        schema: Arc<Schema>,
        table_oid: TableOid,
        filter: Option<Expr>,
    },
    /// Single-column equality probe. `filter` is re-applied on top of the
    /// probed tuple, matching `SeqScan`'s leftover predicate after the
    /// equality itself has been absorbed into the index probe.
    IndexScan {
        schema: Arc<Schema>,
        table_oid: TableOid,
        index_oid: IndexOid,
        probe_key: Value,
        filter: Option<Expr>,
    },
    Insert {
        schema: Arc<Schema>,
        table_oid: TableOid,
        child: Box<PlanNode>,
    },
    Update {
        schema: Arc<Schema>,
        table_oid: TableOid,
        target_exprs: Vec<Expr>,
        child: Box<PlanNode>,
    },
    Delete {
        schema: Arc<Schema>,
        table_oid: TableOid,
        child: Box<PlanNode>,
    },
    NestedLoopJoin {
        schema: Arc<Schema>,
        join_type: JoinType,
        predicate: Expr,
        left: Box<PlanNode>,
        right: Box<PlanNode>,
    },
    HashJoin {
        schema: Arc<Schema>,
        join_type: JoinType,
        left_keys: Vec<Expr>,
        right_keys: Vec<Expr>,
        left: Box<PlanNode>,
        right: Box<PlanNode>,
    },
    Aggregation {
        schema: Arc<Schema>,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateExpr>,
        child: Box<PlanNode>,
    },
    Sort {
        schema: Arc<Schema>,
        order_bys: Vec<OrderBy>,
        child: Box<PlanNode>,
    },
    Limit {
        schema: Arc<Schema>,
        limit: usize,
        child: Box<PlanNode>,
    },
    TopN {
        schema: Arc<Schema>,
        order_bys: Vec<OrderBy>,
        n: usize,
        child: Box<PlanNode>,
    },
    Window {
        schema: Arc<Schema>,
        partition_by: Vec<Expr>,
        order_bys: Vec<OrderBy>,
        func: AggregateFunc,
        arg: Option<Expr>,
        child: Box<PlanNode>,
    },
}

impl PlanNode {
    pub fn output_schema(&self) -> &Arc<Schema> {
        match self {
            PlanNode::Values { schema, .. }
            | PlanNode::SeqScan { schema, .. }
            | PlanNode::IndexScan { schema, .. }
            | PlanNode::Insert { schema, .. }
            | PlanNode::Update { schema, .. }
            | PlanNode::Delete { schema, .. }
            | PlanNode::NestedLoopJoin { schema, .. }
            | PlanNode::HashJoin { schema, .. }
            | PlanNode::Aggregation { schema, .. }
            | PlanNode::Sort { schema, .. }
            | PlanNode::Limit { schema, .. }
            | PlanNode::TopN { schema, .. }
            | PlanNode::Window { schema, .. } => schema,
        }
    }

    /// Direct children, in evaluation order, for rewrites that recurse
    /// bottom-up.
    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            PlanNode::Values { .. } | PlanNode::SeqScan { .. } | PlanNode::IndexScan { .. } => {
                vec![]
            }
            PlanNode::Insert { child, .. }
            | PlanNode::Update { child, .. }
            | PlanNode::Delete { child, .. }
            | PlanNode::Aggregation { child, .. }
            | PlanNode::Sort { child, .. }
            | PlanNode::Limit { child, .. }
            | PlanNode::TopN { child, .. }
            | PlanNode::Window { child, .. } => vec![child.as_ref()],
            PlanNode::NestedLoopJoin { left, right, .. } | PlanNode::HashJoin { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
        }
    }
}
