//! The Volcano iterator protocol every operator implements, plus the
//! factory that turns a [`PlanNode`] tree into a tree of boxed executors.

use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::rid::Rid;
use crate::common::Tuple;
use crate::error::Result;
use crate::execution::context::ExecutorContext;
use crate::execution::operators::{
    AggregationExecutor, DeleteExecutor, HashJoinExecutor, IndexScanExecutor, InsertExecutor,
    LimitExecutor, NestedLoopJoinExecutor, SeqScanExecutor, SortExecutor, TopNExecutor,
    UpdateExecutor, ValuesExecutor, WindowExecutor,
};
use crate::execution::plan::PlanNode;

/// `Init` must be idempotent (safe to call more than once, e.g. when the
/// same subplan is rewound) and reset whatever state `Next` advances.
/// `Next` returns `Ok(None)` once exhausted; it never gets called again
/// afterward by a well-behaved caller.
pub trait Executor {
    fn init(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<Option<(Tuple, Rid)>>;
    fn output_schema(&self) -> &Arc<Schema>;
}

pub fn build_executor(ctx: Arc<ExecutorContext>, plan: &PlanNode) -> Result<Box<dyn Executor>> {
    Ok(match plan {
        PlanNode::Values { schema, rows } => {
            Box::new(ValuesExecutor::new(schema.clone(), rows.clone()))
        }
        PlanNode::SeqScan {
            schema,
            table_oid,
            filter,
        } => Box::new(SeqScanExecutor::new(ctx, *table_oid, schema.clone(), filter.clone())?),
        PlanNode::IndexScan {
            schema,
            table_oid,
            index_oid,
            probe_key,
            filter,
        } => Box::new(IndexScanExecutor::new(
            ctx,
            *table_oid,
            *index_oid,
            schema.clone(),
            probe_key.clone(),
            filter.clone(),
        )?),
        PlanNode::Insert {
            schema,
            table_oid,
            child,
        } => {
            let child = build_executor(ctx.clone(), child)?;
            Box::new(InsertExecutor::new(ctx, *table_oid, schema.clone(), child)?)
        }
        PlanNode::Update {
            schema,
            table_oid,
            target_exprs,
            child,
        } => {
            let child = build_executor(ctx.clone(), child)?;
            Box::new(UpdateExecutor::new(
                ctx,
                *table_oid,
                schema.clone(),
                target_exprs.clone(),
                child,
            )?)
        }
        PlanNode::Delete {
            schema,
            table_oid,
            child,
        } => {
            let child = build_executor(ctx.clone(), child)?;
            Box::new(DeleteExecutor::new(ctx, *table_oid, schema.clone(), child)?)
        }
        PlanNode::NestedLoopJoin {
            schema,
            join_type,
            predicate,
            left,
            right,
        } => {
            let left = build_executor(ctx.clone(), left)?;
            let right = build_executor(ctx, right)?;
            Box::new(NestedLoopJoinExecutor::new(
                schema.clone(),
                *join_type,
                predicate.clone(),
                left,
                right,
            ))
        }
        PlanNode::HashJoin {
            schema,
            join_type,
            left_keys,
            right_keys,
            left,
            right,
        } => {
            let left = build_executor(ctx.clone(), left)?;
            let right = build_executor(ctx, right)?;
            Box::new(HashJoinExecutor::new(
                schema.clone(),
                *join_type,
                left_keys.clone(),
                right_keys.clone(),
                left,
                right,
            ))
        }
        PlanNode::Aggregation {
            schema,
            group_by,
            aggregates,
            child,
        } => {
            let child = build_executor(ctx, child)?;
            Box::new(AggregationExecutor::new(
                schema.clone(),
                group_by.clone(),
                aggregates.clone(),
                child,
            ))
        }
        PlanNode::Sort {
            schema,
            order_bys,
            child,
        } => {
            let child = build_executor(ctx, child)?;
            Box::new(SortExecutor::new(schema.clone(), order_bys.clone(), child))
        }
        PlanNode::Limit { schema, limit, child } => {
            let child = build_executor(ctx, child)?;
            Box::new(LimitExecutor::new(schema.clone(), *limit, child))
        }
        PlanNode::TopN {
            schema,
            order_bys,
            n,
            child,
        } => {
            let child = build_executor(ctx, child)?;
            Box::new(TopNExecutor::new(schema.clone(), order_bys.clone(), *n, child))
        }
        PlanNode::Window {
            schema,
            partition_by,
            order_bys,
            func,
            arg,
            child,
        } => {
            let child = build_executor(ctx, child)?;
            Box::new(WindowExecutor::new(
                schema.clone(),
                partition_by.clone(),
                order_bys.clone(),
                *func,
                arg.clone(),
                child,
            ))
        }
    })
}
