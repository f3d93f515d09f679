use crate::common::{TxnId, Value, INVALID_TXN_ID};

/// Addresses one transaction's undo log by its index within that
/// transaction's private log vector. `(INVALID_TXN_ID, _)` means "no
/// further history" — either because a chain terminates or because no
/// undo log was ever recorded for a RID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoLink {
    pub prev_txn: TxnId,
    pub prev_log_idx: usize,
}

impl UndoLink {
    pub const INVALID: UndoLink = UndoLink {
        prev_txn: INVALID_TXN_ID,
        prev_log_idx: 0,
    };

    pub fn new(prev_txn: TxnId, prev_log_idx: usize) -> Self {
        Self {
            prev_txn,
            prev_log_idx,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.prev_txn != INVALID_TXN_ID
    }
}

impl Default for UndoLink {
    fn default() -> Self {
        Self::INVALID
    }
}

/// A delta that, applied to a newer tuple version, reproduces an older
/// one. `modified_fields[i]` says whether column `i` is present in
/// `tuple`; `tuple` holds only those columns, in column order.
#[derive(Debug, Clone)]
pub struct UndoLog {
    pub ts: crate::common::Timestamp,
    pub is_deleted: bool,
    pub modified_fields: Vec<bool>,
    pub tuple: Vec<Value>,
    pub prev_version: UndoLink,
}

impl UndoLog {
    /// The compact per-column schema this log's `tuple` values line up
    /// with: one entry in `tuple` per `true` bit in `modified_fields`.
    pub fn compact_values(&self) -> &[Value] {
        &self.tuple
    }

    /// Applies this delta on top of `base`, producing the tuple this log
    /// represents. `base` must have one value per bit in
    /// `modified_fields`.
    pub fn undo(&self, base: &[Value]) -> Vec<Value> {
        let mut out = Vec::with_capacity(base.len());
        let mut undo_idx = 0;
        for (i, keep) in self.modified_fields.iter().enumerate() {
            if *keep {
                out.push(self.tuple[undo_idx].clone());
                undo_idx += 1;
            } else {
                out.push(base[i].clone());
            }
        }
        out
    }
}
