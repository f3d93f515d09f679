//! Row update, grounded on `update_executor.cpp` and the MVCC write path
//! from `execution_common.cpp`: pre-scan and conflict-check like delete,
//! then for each row compute the new tuple, skip a no-op write, build a
//! compact delta of only the changed columns, apply the append/modify
//! policy, and overwrite the row in place.

use std::sync::Arc;

use crate::catalog::{Schema, TableInfo};
use crate::common::rid::Rid;
use crate::common::{TableOid, Tuple, Value};
use crate::error::{DbError, Result};
use crate::execution::context::ExecutorContext;
use crate::execution::executor::Executor;
use crate::execution::expr::Expr;
use crate::transaction::manager::WriteCheck;
use crate::transaction::{TransactionState, TupleMeta, UndoLink, UndoLog};

pub struct UpdateExecutor {
    ctx: Arc<ExecutorContext>,
    table: Arc<TableInfo>,
    schema: Arc<Schema>,
    target_exprs: Vec<Expr>,
    child: Box<dyn Executor>,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        table_oid: TableOid,
        schema: Arc<Schema>,
        target_exprs: Vec<Expr>,
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
            target_exprs,
            child,
            done: false,
        })
    }
}

impl Executor for UpdateExecutor {
    fn init(&mut self) -> Result<()> {
        self.done = false;
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.done {
            return Ok(None);
        }
        let child_schema = self.child.output_schema().clone();
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
        for (old_tuple, rid) in rows {
            let new_tuple: Tuple = self
                .target_exprs
                .iter()
                .map(|e| e.evaluate(&old_tuple, &child_schema))
                .collect();
            if new_tuple == old_tuple {
                continue;
            }

            let Some((meta, _)) = self.table.table.get_tuple(rid) else {
                continue;
            };
            let mut modified_fields = Vec::with_capacity(old_tuple.len());
            let mut changed = Vec::new();
            for i in 0..old_tuple.len() {
                let is_changed = old_tuple[i] != new_tuple[i];
                modified_fields.push(is_changed);
                if is_changed {
                    changed.push(old_tuple[i].clone());
                }
            }
            let delta = UndoLog {
                ts: meta.ts,
                is_deleted: false,
                modified_fields,
                tuple: changed,
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

            self.table.table.update_tuple_in_place(
                rid,
                TupleMeta::new(txn.txn_id(), false),
                new_tuple.clone(),
            );
            txn.add_to_write_set(self.table.oid, rid);
            self.ctx.catalog.remove_from_indexes(&self.table.name, &old_tuple);
            self.ctx.catalog.insert_into_indexes(&self.table.name, &new_tuple, rid)?;
            count += 1;
        }

        self.done = true;
        Ok(Some((vec![Value::Integer(count)], Rid::new(-1, 0))))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
