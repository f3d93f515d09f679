//! Row insertion, grounded on `insert_executor.cpp`: drain the child,
//! stamp each row with the inserting transaction's id as its tentative
//! timestamp, record the RID in the write set, and maintain every index.
//! Inserts never create undo logs — there is no prior version to undo to.

use std::sync::Arc;

use crate::catalog::{Schema, TableInfo};
use crate::common::rid::Rid;
use crate::common::{TableOid, Tuple, Value};
use crate::error::{DbError, Result};
use crate::execution::context::ExecutorContext;
use crate::execution::executor::Executor;
use crate::transaction::{TransactionState, TupleMeta};

pub struct InsertExecutor {
    ctx: Arc<ExecutorContext>,
    table: Arc<TableInfo>,
    schema: Arc<Schema>,
    child: Box<dyn Executor>,
    done: bool,
}

impl InsertExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        table_oid: TableOid,
        schema: Arc<Schema>,
        child: Box<dyn Executor>,
    ) -> Result<Self> {
        let table = ctx
            .catalog
            .get_table(table_oid)
            .ok_or_else(|| DbError::NotFound(format!("table oid {table_oid}")))?;
        Ok(Self {
            ctx,
            table,
            schema,
            child,
            done: false,
        })
    }
}

impl Executor for InsertExecutor {
    fn init(&mut self) -> Result<()> {
        self.done = false;
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.done {
            return Ok(None);
        }
        let primary = self.ctx.catalog.primary_index(&self.table.name);
        let mut count: i64 = 0;
        while let Some((tuple, _)) = self.child.next()? {
            if let Some(index) = &primary {
                let key = index.key_from_tuple(&tuple);
                if index.index.get_value(&key).is_some() {
                    self.ctx.txn.set_state(TransactionState::Tainted);
                    return Err(DbError::Conflict("write_write_conflict".into()));
                }
            }
            let meta = TupleMeta::new(self.ctx.txn.txn_id(), false);
            let rid = self.table.table.insert_tuple(meta, tuple.clone());
            self.ctx.txn.add_to_write_set(self.table.oid, rid);
            self.ctx.catalog.insert_into_indexes(&self.table.name, &tuple, rid)?;
            count += 1;
        }
        self.done = true;
        Ok(Some((vec![Value::Integer(count)], Rid::new(-1, 0))))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
