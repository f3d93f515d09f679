//! The Volcano-model execution engine: plan nodes, the expression
//! evaluator, the operator set, and the rule-based rewrites that turn a
//! naive plan into one that uses an index or bounds its materialization.

pub mod context;
pub mod executor;
pub mod expr;
pub mod operators;
pub mod plan;
pub mod rewrite;

pub use context::ExecutorContext;
pub use executor::{build_executor, Executor};
pub use plan::PlanNode;
