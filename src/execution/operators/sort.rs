//! Full materializing sort, grounded on `sort_executor.cpp`: drain the
//! child, sort by the compound `ORDER BY` key (ties fall through to the
//! next key, incomparable values are treated as tied), then stream the
//! sorted rows back out.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::rid::Rid;
use crate::common::Tuple;
use crate::error::Result;
use crate::execution::executor::Executor;
use crate::execution::plan::{OrderBy, OrderByType};

/// Compares two tuples by a compound order-by key. `None`-ordered (i.e.
/// incomparable) values are treated as a tie and fall through to the next
/// key, matching the reference comparator's behavior when neither
/// `CompareLessThan` nor `CompareGreaterThan` holds.
pub(crate) fn compare_by_order(order_bys: &[OrderBy], schema: &Schema, a: &Tuple, b: &Tuple) -> Ordering {
    for (direction, expr) in order_bys {
        let av = expr.evaluate(a, schema);
        let bv = expr.evaluate(b, schema);
        let ord = match av.partial_cmp(&bv) {
            Some(ord) => ord,
            None => continue,
        };
        let ord = match direction {
            OrderByType::Asc => ord,
            OrderByType::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

pub struct SortExecutor {
    schema: Arc<Schema>,
    order_bys: Vec<OrderBy>,
    child: Box<dyn Executor>,
    rows: Vec<(Tuple, Rid)>,
    pos: usize,
}

impl SortExecutor {
    pub fn new(schema: Arc<Schema>, order_bys: Vec<OrderBy>, child: Box<dyn Executor>) -> Self {
        Self {
            schema,
            order_bys,
            child,
            rows: Vec::new(),
            pos: 0,
        }
    }
}

impl Executor for SortExecutor {
    fn init(&mut self) -> Result<()> {
        self.rows.clear();
        self.pos = 0;
        self.child.init()?;
        while let Some(row) = self.child.next()? {
            self.rows.push(row);
        }
        let schema = self.schema.clone();
        self.rows
            .sort_by(|(a, _), (b, _)| compare_by_order(&self.order_bys, &schema, a, b));
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.pos >= self.rows.len() {
            return Ok(None);
        }
        let row = self.rows[self.pos].clone();
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

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![Column::new("n", DataType::Integer)]))
    }

    #[test]
    fn sorts_ascending_by_default() {
        let schema = schema();
        let rows = vec![
            vec![Value::Integer(3)],
            vec![Value::Integer(1)],
            vec![Value::Integer(2)],
        ];
        let child = Box::new(ValuesExecutor::new(schema.clone(), rows));
        let mut sort = SortExecutor::new(
            schema.clone(),
            vec![(OrderByType::Asc, Expr::column(0))],
            child,
        );
        sort.init().unwrap();
        let mut out = Vec::new();
        while let Some((t, _)) = sort.next().unwrap() {
            out.push(t[0].clone());
        }
        assert_eq!(out, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
    }

    #[test]
    fn sorts_descending() {
        let schema = schema();
        let rows = vec![vec![Value::Integer(1)], vec![Value::Integer(2)]];
        let child = Box::new(ValuesExecutor::new(schema.clone(), rows));
        let mut sort = SortExecutor::new(
            schema.clone(),
            vec![(OrderByType::Desc, Expr::column(0))],
            child,
        );
        sort.init().unwrap();
        let (first, _) = sort.next().unwrap().unwrap();
        assert_eq!(first[0], Value::Integer(2));
    }
}
