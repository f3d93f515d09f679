//! Everything an executor needs to reach outside itself: the catalog (to
//! resolve table/index oids), the transaction manager (snapshot reads,
//! conflict checks, undo logs), and the transaction it's running under.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::transaction::{Transaction, TransactionManager};

pub struct ExecutorContext {
    pub catalog: Arc<Catalog>,
    pub txn_manager: Arc<TransactionManager>,
    pub txn: Arc<Transaction>,
}

impl ExecutorContext {
    pub fn new(catalog: Arc<Catalog>, txn_manager: Arc<TransactionManager>, txn: Arc<Transaction>) -> Self {
        Self {
            catalog,
            txn_manager,
            txn,
        }
    }
}
