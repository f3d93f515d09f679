//! Caps a child's output at `limit` rows, per `limit_executor.cpp`.

use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::rid::Rid;
use crate::common::Tuple;
use crate::error::Result;
use crate::execution::executor::Executor;

pub struct LimitExecutor {
    schema: Arc<Schema>,
    limit: usize,
    child: Box<dyn Executor>,
    emitted: usize,
}

impl LimitExecutor {
    pub fn new(schema: Arc<Schema>, limit: usize, child: Box<dyn Executor>) -> Self {
        Self {
            schema,
            limit,
            child,
            emitted: 0,
        }
    }
}

impl Executor for LimitExecutor {
    fn init(&mut self) -> Result<()> {
        self.emitted = 0;
        self.child.init()
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.emitted >= self.limit {
            return Ok(None);
        }
        let row = self.child.next()?;
        if row.is_some() {
            self.emitted += 1;
        }
        Ok(row)
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
