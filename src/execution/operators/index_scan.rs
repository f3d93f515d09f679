//! Single-key equality probe against an index, per `index_scan_executor.cpp`:
//! one lookup, then the same visibility/filter handling a seq scan applies
//! to whatever single tuple comes back.

use std::sync::Arc;

use crate::catalog::{IndexInfo, Schema, TableInfo};
use crate::common::rid::Rid;
use crate::common::{IndexOid, TableOid, Tuple, Value};
use crate::error::{DbError, Result};
use crate::execution::context::ExecutorContext;
use crate::execution::executor::Executor;
use crate::execution::expr::Expr;

pub struct IndexScanExecutor {
    ctx: Arc<ExecutorContext>,
    table: Arc<TableInfo>,
    index: Arc<IndexInfo>,
    schema: Arc<Schema>,
    probe_key: Value,
    filter: Option<Expr>,
    probed: Option<Rid>,
    done: bool,
}

impl IndexScanExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        table_oid: TableOid,
        index_oid: IndexOid,
        schema: Arc<Schema>,
        probe_key: Value,
        filter: Option<Expr>,
    ) -> Result<Self> {
        let table = ctx
            .catalog
            .get_table(table_oid)
            .ok_or_else(|| DbError::NotFound(format!("table oid {table_oid}")))?;
        let index = ctx
            .catalog
            .get_index(index_oid)
            .ok_or_else(|| DbError::NotFound(format!("index oid {index_oid}")))?;
        Ok(Self {
            ctx,
            table,
            index,
            schema,
            probe_key,
            filter,
            probed: None,
            done: false,
        })
    }
}

impl Executor for IndexScanExecutor {
    fn init(&mut self) -> Result<()> {
        self.done = false;
        self.probed = self.index.index.get_value(&self.probe_key);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let Some(rid) = self.probed else {
            return Ok(None);
        };
        let Some((meta, tuple)) = self.table.table.get_tuple(rid) else {
            return Ok(None);
        };
        let Some(visible) = self.ctx.txn_manager.read_time_tuple(
            rid,
            self.ctx.txn.read_ts(),
            self.ctx.txn.txn_id(),
            &tuple,
            &meta,
        ) else {
            return Ok(None);
        };
        if let Some(filter) = &self.filter {
            if !Expr::is_true(&filter.evaluate(&visible, &self.schema)) {
                return Ok(None);
            }
        }
        Ok(Some((visible, rid)))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
