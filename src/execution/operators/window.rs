//! Windowed aggregates, grounded on `window_function_executor.cpp`: sort
//! by `ORDER BY` when present (otherwise keep input order), then stream
//! one output row per input row carrying a per-partition running
//! accumulator value. The accumulator advances on every row, but a tied
//! tuple — same partition key, equal under `ORDER BY` — is emitted with
//! the preceding row's value instead of its own, which is what makes a
//! `CountStar` accumulator here behave like `RANK()` rather than
//! `ROW_NUMBER()` or `DENSE_RANK()`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::rid::Rid;
use crate::common::{Tuple, Value};
use crate::error::Result;
use crate::execution::executor::Executor;
use crate::execution::expr::Expr;
use crate::execution::operators::aggregation::Acc;
use crate::execution::operators::sort::compare_by_order;
use crate::execution::plan::{AggregateFunc, OrderBy};

pub struct WindowExecutor {
    schema: Arc<Schema>,
    partition_by: Vec<Expr>,
    order_bys: Vec<OrderBy>,
    func: AggregateFunc,
    arg: Option<Expr>,
    child: Box<dyn Executor>,
    rows: Vec<Tuple>,
    pos: usize,
}

impl WindowExecutor {
    pub fn new(
        schema: Arc<Schema>,
        partition_by: Vec<Expr>,
        order_bys: Vec<OrderBy>,
        func: AggregateFunc,
        arg: Option<Expr>,
        child: Box<dyn Executor>,
    ) -> Self {
        Self {
            schema,
            partition_by,
            order_bys,
            func,
            arg,
            child,
            rows: Vec::new(),
            pos: 0,
        }
    }

    fn partition_key(&self, tuple: &Tuple, schema: &Schema) -> Vec<Value> {
        self.partition_by.iter().map(|e| e.evaluate(tuple, schema)).collect()
    }

    fn ties(order_bys: &[OrderBy], schema: &Schema, a: &Tuple, b: &Tuple) -> bool {
        !order_bys.is_empty()
            && compare_by_order(order_bys, schema, a, b) == std::cmp::Ordering::Equal
    }
}

impl Executor for WindowExecutor {
    fn init(&mut self) -> Result<()> {
        self.rows.clear();
        self.pos = 0;
        self.child.init()?;
        let child_schema = self.child.output_schema().clone();

        let mut input: Vec<Tuple> = Vec::new();
        while let Some((tuple, _)) = self.child.next()? {
            input.push(tuple);
        }
        if !self.order_bys.is_empty() {
            input.sort_by(|a, b| compare_by_order(&self.order_bys, &child_schema, a, b));
        }

        let mut accs: HashMap<Vec<Value>, Acc> = HashMap::new();
        let mut last_in_partition: HashMap<Vec<Value>, (Tuple, Value)> = HashMap::new();
        let mut out_rows = Vec::with_capacity(input.len());

        for tuple in input {
            let key = self.partition_key(&tuple, &child_schema);
            let tied = last_in_partition
                .get(&key)
                .map(|(prev_tuple, _)| Self::ties(&self.order_bys, &child_schema, prev_tuple, &tuple))
                .unwrap_or(false);

            // The accumulator always advances, tie or not — only the
            // *emitted* value is held back on a tie, which is what turns a
            // running `CountStar` into `RANK()` instead of `DENSE_RANK()`.
            let acc = accs.entry(key.clone()).or_insert_with(|| Acc::identity(self.func));
            let input_value = self.arg.as_ref().map(|e| e.evaluate(&tuple, &child_schema));
            acc.combine(input_value.as_ref());
            let finished = acc.finish();

            let window_value = if tied {
                last_in_partition[&key].1.clone()
            } else {
                finished
            };

            last_in_partition.insert(key, (tuple.clone(), window_value.clone()));
            let mut row = tuple;
            row.push(window_value);
            out_rows.push(row);
        }

        self.rows = out_rows;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.pos >= self.rows.len() {
            return Ok(None);
        }
        let row = self.rows[self.pos].clone();
        self.pos += 1;
        Ok(Some((row, Rid::new(-1, 0))))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType};
    use crate::execution::operators::values::ValuesExecutor;
    use crate::execution::plan::OrderByType;

    #[test]
    fn tied_rows_inherit_the_preceding_rank_but_the_accumulator_still_advances() {
        let child_schema = Arc::new(Schema::new(vec![
            Column::new("part", DataType::Integer),
            Column::new("score", DataType::Integer),
        ]));
        let out_schema = Arc::new(Schema::new(vec![
            Column::new("part", DataType::Integer),
            Column::new("score", DataType::Integer),
            Column::new("rank", DataType::Integer),
        ]));
        let rows = vec![
            vec![Value::Integer(1), Value::Integer(10)],
            vec![Value::Integer(1), Value::Integer(10)],
            vec![Value::Integer(1), Value::Integer(20)],
        ];
        let child = Box::new(ValuesExecutor::new(child_schema, rows));
        let mut window = WindowExecutor::new(
            out_schema,
            vec![Expr::column(0)],
            vec![(OrderByType::Asc, Expr::column(1))],
            AggregateFunc::CountStar,
            None,
            child,
        );
        window.init().unwrap();
        let mut ranks = Vec::new();
        while let Some((t, _)) = window.next().unwrap() {
            ranks.push(t[2].clone());
        }
        assert_eq!(
            ranks,
            vec![Value::Integer(1), Value::Integer(1), Value::Integer(3)]
        );
    }
}
