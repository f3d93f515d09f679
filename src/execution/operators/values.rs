//! A literal row source. Not part of the reference operator set but a
//! natural leaf to feed `Insert`/`Update`/`Delete` constant rows without a
//! real table underneath, and handy for exercising the other operators in
//! isolation.

use std::sync::Arc;

use crate::catalog::Schema;
use crate::common::rid::Rid;
use crate::common::Tuple;
use crate::error::Result;
use crate::execution::executor::Executor;

pub struct ValuesExecutor {
    schema: Arc<Schema>,
    rows: Vec<Tuple>,
    pos: usize,
}

impl ValuesExecutor {
    pub fn new(schema: Arc<Schema>, rows: Vec<Tuple>) -> Self {
        Self { schema, rows, pos: 0 }
    }
}

impl Executor for ValuesExecutor {
    fn init(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, Rid)>> {
        if self.pos >= self.rows.len() {
            return Ok(None);
        }
        let tuple = self.rows[self.pos].clone();
        let rid = Rid::new(-1, self.pos as u32);
        self.pos += 1;
        Ok(Some((tuple, rid)))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
