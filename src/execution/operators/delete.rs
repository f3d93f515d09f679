//! Row deletion, grounded on `delete_executor.cpp` plus the MVCC write
//! path from `execution_common.cpp`: pre-scan the child's RIDs (aborting
//! the whole operation on any write-write conflict), then for each RID
//! apply the append/modify undo-log policy with an all-columns delta (the
//! deleted row was every column) and flip the tombstone bit.

use std::sync::Arc;

use crate::catalog::{Schema, TableInfo};
use crate::common::rid::Rid;
use crate::common::{TableOid, Tuple, Value};
use crate::error::{DbError, Result};
use crate::execution::context::ExecutorContext;
use crate::execution::executor::Executor;
use crate::transaction::manager::WriteCheck;
use crate::transaction::{TransactionState, TupleMeta, UndoLink, UndoLog};

pub struct DeleteExecutor {
    ctx: Arc<ExecutorContext>,
    table: Arc<TableInfo>,
    schema: Arc<Schema>,
    child: Box<dyn Executor>,
    done: bool,
}

impl DeleteExecutor {
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

impl Executor for DeleteExecutor {
    fn init(&mut self) -> Result<()> {
        self.done = false;
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.done {
            return Ok(None);
        }
        let mut rows = Vec::new();
        while let Some((tuple, rid)) = self.child.next()? {
            rows.push((tuple, rid));
        }

        let txn = &self.ctx.txn;
        for (_, rid) in &rows {
            let Some((meta, _)) = self.table.table.get_tuple(*rid) else {
                continue;
            };
            if self.ctx.txn_manager.check_write_conflict(&meta, txn.txn_id(), txn.read_ts())
                == WriteCheck::Conflict
            {
                txn.set_state(TransactionState::Tainted);
                return Err(DbError::Conflict("write_write_conflict".into()));
            }
        }

        let mut count: i64 = 0;
        for (tuple, rid) in rows {
            let Some((meta, _)) = self.table.table.get_tuple(rid) else {
                continue;
            };
            let width = tuple.len();
            let delta = UndoLog {
                ts: meta.ts,
                is_deleted: meta.is_deleted,
                modified_fields: vec![true; width],
                tuple: tuple.clone(),
                prev_version: UndoLink::INVALID,
            };
            match self.ctx.txn_manager.check_write_conflict(&meta, txn.txn_id(), txn.read_ts()) {
                WriteCheck::Conflict => unreachable!("conflicts were pre-checked above"),
                WriteCheck::AppendNewUndoLog => {
                    self.ctx.txn_manager.append_undo_log(txn, rid, delta);
                }
                WriteCheck::ModifyOwnUndoLog => {
                    self.ctx.txn_manager.modify_undo_log(txn, rid, &delta);
                }
            }
            self.table
                .table
                .update_tuple_meta(rid, TupleMeta::new(txn.txn_id(), true));
            txn.add_to_write_set(self.table.oid, rid);
            self.ctx.catalog.remove_from_indexes(&self.table.name, &tuple);
            count += 1;
        }

        self.done = true;
        Ok(Some((vec![Value::Integer(count)], Rid::new(-1, 0))))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
