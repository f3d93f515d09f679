//! Top-N, grounded on `topn_executor.cpp`/`topn_executor.h`: keeps only
//! the `n` best rows under the order-by key as the child is drained,
//! never materializing more than `n` candidates at once (the reference
//! implementation does this with a heap; a sorted `Vec` bounded at `n` is
//! the same idea with less code). `get_num_in_heap` exposes how many
//! candidates are currently held, mirroring the reference accessor used to
//! assert the bound in tests.

use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::rid::Rid;
use crate::common::Tuple;
use crate::error::Result;
use crate::execution::executor::Executor;
use crate::execution::operators::sort::compare_by_order;
use crate::execution::plan::OrderBy;

pub struct TopNExecutor {
    schema: Arc<Schema>,
    order_bys: Vec<OrderBy>,
    n: usize,
    child: Box<dyn Executor>,
    candidates: Vec<(Tuple, Rid)>,
    pos: usize,
}

impl TopNExecutor {
    pub fn new(schema: Arc<Schema>, order_bys: Vec<OrderBy>, n: usize, child: Box<dyn Executor>) -> Self {
        Self {
            schema,
            order_bys,
            n,
            child,
            candidates: Vec::new(),
            pos: 0,
        }
    }

    /// Number of candidate rows currently retained, always `<= n`.
    pub fn get_num_in_heap(&self) -> usize {
        self.candidates.len()
    }

    fn offer(&mut self, row: (Tuple, Rid)) {
        if self.n == 0 {
            return;
        }
        let idx = self
            .candidates
            .binary_search_by(|(t, _)| compare_by_order(&self.order_bys, &self.schema, t, &row.0))
            .unwrap_or_else(|i| i);
        if self.candidates.len() < self.n {
            self.candidates.insert(idx, row);
        } else if idx < self.candidates.len() {
            self.candidates.insert(idx, row);
            self.candidates.pop();
        }
    }
}

impl Executor for TopNExecutor {
    fn init(&mut self) -> Result<()> {
        self.candidates.clear();
        self.pos = 0;
        self.child.init()?;
        while let Some(row) = self.child.next()? {
            self.offer(row);
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.pos >= self.candidates.len() {
            return Ok(None);
        }
        let row = self.candidates[self.pos].clone();
        self.pos += 1;
        Ok(Some(row))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType};
    use crate::common::Value;
    use crate::execution::expr::Expr;
    use crate::execution::operators::values::ValuesExecutor;
    use crate::execution::plan::OrderByType;

    #[test]
    fn never_holds_more_than_n_candidates() {
        let schema = Arc::new(Schema::new(vec![Column::new("n", DataType::Integer)]));
        let rows = (0..20).rev().map(|i| vec![Value::Integer(i)]).collect();
        let child = Box::new(ValuesExecutor::new(schema.clone(), rows));
        let mut topn = TopNExecutor::new(schema.clone(), vec![(OrderByType::Asc, Expr::column(0))], 3, child);
        topn.init().unwrap();
        assert_eq!(topn.get_num_in_heap(), 3);
        let mut out = Vec::new();
        while let Some((t, _)) = topn.next().unwrap() {
            out.push(t[0].clone());
        }
        assert_eq!(out, vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)]);
    }
}
