//! Full-table MVCC scan. Grounded on `seq_scan_executor.cpp`: iterate
//! every RID the heap has ever allocated, reconstruct the version visible
//! to this transaction's snapshot, skip absent/tombstoned versions and
//! rows the filter rejects.

use std::sync::Arc;

use crate::catalog::{Schema, TableInfo};
use crate::common::rid::Rid;
use crate::common::{TableOid, Tuple};
use crate::error::{DbError, Result};
use crate::execution::context::ExecutorContext;
use crate::execution::executor::Executor;
use crate::execution::expr::Expr;

pub struct SeqScanExecutor {
    ctx: Arc<ExecutorContext>,
    table: Arc<TableInfo>,
    schema: Arc<Schema>,
    filter: Option<Expr>,
    rids: Vec<Rid>,
    pos: usize,
}

impl SeqScanExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        table_oid: TableOid,
        schema: Arc<Schema>,
        filter: Option<Expr>,
    ) -> Result<Self> {
        let table = ctx
            .catalog
            .get_table(table_oid)
            .ok_or_else(|| DbError::NotFound(format!("table oid {table_oid}")))?;
        Ok(Self {
            ctx,
            table,
            schema,
            filter,
            rids: Vec::new(),
            pos: 0,
        })
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> Result<()> {
        self.rids = self.table.table.all_rids();
        self.pos = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        while self.pos < self.rids.len() {
            let rid = self.rids[self.pos];
            self.pos += 1;
            let Some((meta, tuple)) = self.table.table.get_tuple(rid) else {
                continue;
            };
            let Some(visible) = self.ctx.txn_manager.read_time_tuple(
                rid,
                self.ctx.txn.read_ts(),
                self.ctx.txn.txn_id(),
                &tuple,
                &meta,
            ) else {
                continue;
            };
            if let Some(filter) = &self.filter {
                if !Expr::is_true(&filter.evaluate(&visible, &self.schema)) {
                    continue;
                }
            }
            return Ok(Some((visible, rid)));
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
