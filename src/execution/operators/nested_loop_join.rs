//! Nested-loop join, grounded on `nested_loop_join_executor.cpp`: for
//! every left tuple, rewind the right child and emit every pairing the
//! predicate accepts. A `LEFT` join that finds no match for a left tuple
//! emits it once, null-padded on the right.

use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::rid::Rid;
use crate::common::{Tuple, Value};
use crate::error::Result;
use crate::execution::executor::Executor;
use crate::execution::expr::Expr;
use crate::execution::plan::JoinType;

pub struct NestedLoopJoinExecutor {
    schema: Arc<Schema>,
    join_type: JoinType,
    predicate: Expr,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    current_left: Option<Tuple>,
    left_matched: bool,
    right_width: usize,
    done: bool,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        schema: Arc<Schema>,
        join_type: JoinType,
        predicate: Expr,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Self {
        let right_width = right.output_schema().column_count();
        Self {
            schema,
            join_type,
            predicate,
            left,
            right,
            current_left: None,
            left_matched: false,
            right_width,
            done: false,
        }
    }

    fn advance_left(&mut self) -> Result<bool> {
        match self.left.next()? {
            Some((tuple, _)) => {
                self.current_left = Some(tuple);
                self.left_matched = false;
                self.right.init()?;
                Ok(true)
            }
            None => {
                self.current_left = None;
                Ok(false)
            }
        }
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.done = false;
        self.current_left = None;
        self.left.init()?;
        self.advance_left()?;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.done {
            return Ok(None);
        }
        loop {
            let Some(left_tuple) = self.current_left.clone() else {
                self.done = true;
                return Ok(None);
            };

            let left_schema = self.left.output_schema().clone();
            let right_schema = self.right.output_schema().clone();
            while let Some((right_tuple, _)) = self.right.next()? {
                let matches = Expr::is_true(&self.predicate.evaluate_join(
                    &left_tuple,
                    &left_schema,
                    &right_tuple,
                    &right_schema,
                ));
                if matches {
                    self.left_matched = true;
                    let mut out = left_tuple.clone();
                    out.extend(right_tuple);
                    return Ok(Some((out, Rid::new(-1, 0))));
                }
            }

            // Right side exhausted for this left tuple.
            if self.join_type == JoinType::Left && !self.left_matched {
                self.left_matched = true;
                let mut out = left_tuple.clone();
                out.extend(std::iter::repeat(Value::Null).take(self.right_width));
                self.advance_left()?;
                return Ok(Some((out, Rid::new(-1, 0))));
            }

            if !self.advance_left()? {
                self.done = true;
                return Ok(None);
            }
        }
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
