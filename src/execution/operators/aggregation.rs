//! Hash aggregation, grounded on `aggregation_executor.cpp`. Drains the
//! child into a hash table keyed by the evaluated group-by tuple, combines
//! every row into a per-group accumulator, then streams one row per group.
//! The accumulator state machine (`CountStar` starts at zero and counts
//! every row regardless of nulls; `Count`/`Sum`/`Min`/`Max`/`Avg` start at
//! the identity and only combine non-null input) follows the reference
//! `SimpleAggregationHashTable::CombineAggregateValues`. With no group-by
//! columns, an empty input still emits a single row of identity values —
//! `SELECT COUNT(*) FROM t WHERE false` returns one row holding zero, not
//! zero rows.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::rid::Rid;
use crate::common::{Tuple, Value};
use crate::error::Result;
use crate::execution::executor::Executor;
use crate::execution::expr::Expr;
use crate::execution::plan::{AggregateExpr, AggregateFunc};

#[derive(Debug, Clone)]
pub(crate) enum Acc {
    CountStar(i64),
    Count(i64),
    Sum(Option<i64>),
    Min(Option<Value>),
    Max(Option<Value>),
    Avg { sum: i64, count: i64 },
}

impl Acc {
    pub(crate) fn identity(func: AggregateFunc) -> Self {
        match func {
            AggregateFunc::CountStar => Acc::CountStar(0),
            AggregateFunc::Count => Acc::Count(0),
            AggregateFunc::Sum => Acc::Sum(None),
            AggregateFunc::Min => Acc::Min(None),
            AggregateFunc::Max => Acc::Max(None),
            AggregateFunc::Avg => Acc::Avg { sum: 0, count: 0 },
        }
    }

    pub(crate) fn combine(&mut self, input: Option<&Value>) {
        match self {
            Acc::CountStar(n) => *n += 1,
            Acc::Count(n) => {
                if let Some(v) = input {
                    if !v.is_null() {
                        *n += 1;
                    }
                }
            }
            Acc::Sum(acc) => {
                if let Some(Value::Integer(i)) = input {
                    *acc = Some(acc.unwrap_or(0) + i);
                }
            }
            Acc::Min(acc) => {
                if let Some(v) = input {
                    if !v.is_null() {
                        *acc = Some(match acc.take() {
                            Some(cur) if cur.partial_cmp(v) == Some(std::cmp::Ordering::Less) => cur,
                            _ => v.clone(),
                        });
                    }
                }
            }
            Acc::Max(acc) => {
                if let Some(v) = input {
                    if !v.is_null() {
                        *acc = Some(match acc.take() {
                            Some(cur) if cur.partial_cmp(v) == Some(std::cmp::Ordering::Greater) => cur,
                            _ => v.clone(),
                        });
                    }
                }
            }
            Acc::Avg { sum, count } => {
                if let Some(Value::Integer(i)) = input {
                    *sum += i;
                    *count += 1;
                }
            }
        }
    }

    pub(crate) fn finish(&self) -> Value {
        match self {
            Acc::CountStar(n) => Value::Integer(*n),
            Acc::Count(n) => Value::Integer(*n),
            Acc::Sum(acc) => acc.map(Value::Integer).unwrap_or(Value::Null),
            Acc::Min(acc) => acc.clone().unwrap_or(Value::Null),
            Acc::Max(acc) => acc.clone().unwrap_or(Value::Null),
            Acc::Avg { sum, count } => {
                if *count == 0 {
                    Value::Null
                } else {
                    Value::Integer(sum / count)
                }
            }
        }
    }
}

pub struct AggregationExecutor {
    schema: Arc<Schema>,
    group_by: Vec<Expr>,
    aggregates: Vec<AggregateExpr>,
    child: Box<dyn Executor>,
    rows: Vec<Tuple>,
    pos: usize,
}

impl AggregationExecutor {
    pub fn new(
        schema: Arc<Schema>,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateExpr>,
        child: Box<dyn Executor>,
    ) -> Self {
        Self {
            schema,
            group_by,
            aggregates,
            child,
            rows: Vec::new(),
            pos: 0,
        }
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> Result<()> {
        self.rows.clear();
        self.pos = 0;
        self.child.init()?;
        let child_schema = self.child.output_schema().clone();

        let mut table: HashMap<Vec<Value>, Vec<Acc>> = HashMap::new();
        let mut order: Vec<Vec<Value>> = Vec::new();
        while let Some((tuple, _)) = self.child.next()? {
            let key: Vec<Value> = self
                .group_by
                .iter()
                .map(|e| e.evaluate(&tuple, &child_schema))
                .collect();
            let entry = table.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                self.aggregates.iter().map(|a| Acc::identity(a.func)).collect()
            });
            for (acc, agg) in entry.iter_mut().zip(&self.aggregates) {
                let value = agg.arg.as_ref().map(|e| e.evaluate(&tuple, &child_schema));
                acc.combine(value.as_ref());
            }
        }

        if table.is_empty() && self.group_by.is_empty() {
            let accs: Vec<Acc> = self.aggregates.iter().map(|a| Acc::identity(a.func)).collect();
            let mut row = Vec::with_capacity(accs.len());
            row.extend(accs.iter().map(Acc::finish));
            self.rows.push(row);
        } else {
            for key in order {
                let accs = &table[&key];
                let mut row = key;
                row.extend(accs.iter().map(Acc::finish));
                self.rows.push(row);
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.pos >= self.rows.len() {
            return Ok(None);
        }
        let tuple = self.rows[self.pos].clone();
        self.pos += 1;
        Ok(Some((tuple, Rid::new(-1, 0))))
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

    #[test]
    fn count_star_on_empty_input_yields_one_row_of_zero() {
        let child_schema = Arc::new(Schema::new(vec![Column::new("n", DataType::Integer)]));
        let out_schema = Arc::new(Schema::new(vec![Column::new("count", DataType::Integer)]));
        let child = Box::new(ValuesExecutor::new(child_schema, vec![]));
        let mut agg = AggregationExecutor::new(
            out_schema,
            vec![],
            vec![AggregateExpr {
                func: AggregateFunc::CountStar,
                arg: None,
            }],
            child,
        );
        agg.init().unwrap();
        let (tuple, _) = agg.next().unwrap().unwrap();
        assert_eq!(tuple, vec![Value::Integer(0)]);
        assert!(agg.next().unwrap().is_none());
    }

    #[test]
    fn sums_per_group() {
        let child_schema = Arc::new(Schema::new(vec![
            Column::new("g", DataType::Integer),
            Column::new("v", DataType::Integer),
        ]));
        let out_schema = Arc::new(Schema::new(vec![
            Column::new("g", DataType::Integer),
            Column::new("sum", DataType::Integer),
        ]));
        let rows = vec![
            vec![Value::Integer(1), Value::Integer(10)],
            vec![Value::Integer(1), Value::Integer(5)],
            vec![Value::Integer(2), Value::Integer(7)],
        ];
        let child = Box::new(ValuesExecutor::new(child_schema, rows));
        let mut agg = AggregationExecutor::new(
            out_schema,
            vec![Expr::column(0)],
            vec![AggregateExpr {
                func: AggregateFunc::Sum,
                arg: Some(Expr::column(1)),
            }],
            child,
        );
        agg.init().unwrap();
        let mut totals = HashMap::new();
        while let Some((t, _)) = agg.next().unwrap() {
            totals.insert(t[0].clone(), t[1].clone());
        }
        assert_eq!(totals[&Value::Integer(1)], Value::Integer(15));
        assert_eq!(totals[&Value::Integer(2)], Value::Integer(7));
    }
}
