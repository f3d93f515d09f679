use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::common::rid::Rid;
use crate::common::{TableOid, Timestamp, TxnId};
use crate::transaction::undo_log::{UndoLink, UndoLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// The only policy this engine actually enforces; snapshot reads plus
    /// write-write conflict detection.
    SnapshotIsolation,
    /// Accepted by `Begin` and routed through the `VerifyTxn` hook, which
    /// always returns true — no SSI validation is implemented.
    Serializable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Running,
    Tainted,
    Committed,
    Aborted,
}

pub struct Transaction {
    txn_id: TxnId,
    isolation_level: IsolationLevel,
    read_ts: Timestamp,
    state: Mutex<TransactionState>,
    commit_ts: Mutex<Option<Timestamp>>,
    write_set: Mutex<HashMap<TableOid, HashSet<Rid>>>,
    undo_logs: Mutex<Vec<UndoLog>>,
}

impl Transaction {
    pub fn new(txn_id: TxnId, isolation_level: IsolationLevel, read_ts: Timestamp) -> Self {
        Self {
            txn_id,
            isolation_level,
            read_ts,
            state: Mutex::new(TransactionState::Running),
            commit_ts: Mutex::new(None),
            write_set: Mutex::new(HashMap::new()),
            undo_logs: Mutex::new(Vec::new()),
        }
    }

    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub fn read_ts(&self) -> Timestamp {
        self.read_ts
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: TransactionState) {
        *self.state.lock() = state;
    }

    pub fn commit_ts(&self) -> Option<Timestamp> {
        *self.commit_ts.lock()
    }

    pub fn set_commit_ts(&self, ts: Timestamp) {
        *self.commit_ts.lock() = Some(ts);
    }

    pub fn add_to_write_set(&self, table: TableOid, rid: Rid) {
        self.write_set.lock().entry(table).or_default().insert(rid);
    }

    pub fn write_set(&self) -> HashMap<TableOid, HashSet<Rid>> {
        self.write_set.lock().clone()
    }

    /// Appends a new undo log owned by this transaction and returns the
    /// link addressing it.
    pub fn append_undo_log(&self, log: UndoLog) -> UndoLink {
        let mut logs = self.undo_logs.lock();
        let idx = logs.len();
        logs.push(log);
        UndoLink::new(self.txn_id, idx)
    }

    pub fn get_undo_log(&self, idx: usize) -> UndoLog {
        self.undo_logs.lock()[idx].clone()
    }

    pub fn modify_undo_log(&self, idx: usize, log: UndoLog) {
        self.undo_logs.lock()[idx] = log;
    }

    pub fn undo_log_count(&self) -> usize {
        self.undo_logs.lock().len()
    }
}
