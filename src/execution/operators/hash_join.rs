//! Hash join, grounded on `hash_join_executor.cpp`: build a hash table
//! over the left child keyed by the left key expressions, then probe with
//! every right tuple, emitting the cartesian product for each key present
//! on both sides. `LEFT` additionally emits every left tuple that no right
//! tuple ever matched, null-padded. Results are built eagerly at `Init`
//! time (a materializing hash join) rather than streamed lazily.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::rid::Rid;
use crate::common::{Tuple, Value};
use crate::error::Result;
use crate::execution::executor::Executor;
use crate::execution::expr::Expr;
use crate::execution::plan::JoinType;

pub struct HashJoinExecutor {
    schema: Arc<Schema>,
    join_type: JoinType,
    left_keys: Vec<Expr>,
    right_keys: Vec<Expr>,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    output: Vec<Tuple>,
    pos: usize,
}

impl HashJoinExecutor {
    pub fn new(
        schema: Arc<Schema>,
        join_type: JoinType,
        left_keys: Vec<Expr>,
        right_keys: Vec<Expr>,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Self {
        Self {
            schema,
            join_type,
            left_keys,
            right_keys,
            left,
            right,
            output: Vec::new(),
            pos: 0,
        }
    }

    fn eval_key(exprs: &[Expr], tuple: &Tuple, schema: &Schema) -> Vec<Value> {
        exprs.iter().map(|e| e.evaluate(tuple, schema)).collect()
    }

    fn build(&mut self) -> Result<()> {
        self.output.clear();
        self.left.init()?;
        self.right.init()?;

        let left_schema = self.left.output_schema().clone();
        let right_width = self.right.output_schema().column_count();

        let mut build_table: HashMap<Vec<Value>, Vec<Tuple>> = HashMap::new();
        let mut matched: HashMap<Vec<Value>, Vec<bool>> = HashMap::new();
        while let Some((tuple, _)) = self.left.next()? {
            let key = Self::eval_key(&self.left_keys, &tuple, &left_schema);
            matched.entry(key.clone()).or_default().push(false);
            build_table.entry(key).or_default().push(tuple);
        }

        let right_schema = self.right.output_schema().clone();
        while let Some((right_tuple, _)) = self.right.next()? {
            let key = Self::eval_key(&self.right_keys, &right_tuple, &right_schema);
            if let Some(left_rows) = build_table.get(&key) {
                let flags = matched.get_mut(&key).expect("key present in build table");
                for (i, left_tuple) in left_rows.iter().enumerate() {
                    flags[i] = true;
                    let mut out = left_tuple.clone();
                    out.extend(right_tuple.clone());
                    self.output.push(out);
                }
            }
        }

        if self.join_type == JoinType::Left {
            for (key, rows) in &build_table {
                let flags = &matched[key];
                for (i, left_tuple) in rows.iter().enumerate() {
                    if !flags[i] {
                        let mut out = left_tuple.clone();
                        out.extend(std::iter::repeat(Value::Null).take(right_width));
                        self.output.push(out);
                    }
                }
            }
        }
        Ok(())
    }
}

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> Result<()> {
        self.pos = 0;
        self.build()
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.pos >= self.output.len() {
            return Ok(None);
        }
        let tuple = self.output[self.pos].clone();
        self.pos += 1;
        Ok(Some((tuple, Rid::new(-1, 0))))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
