use crate::common::Timestamp;

/// Per-tuple version metadata: the timestamp of the version currently
/// sitting in the table heap (a commit timestamp below `TXN_START_ID`, or
/// an in-progress writer's txn id at or above it), and whether that
/// version is a tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleMeta {
    pub ts: Timestamp,
    pub is_deleted: bool,
}

impl TupleMeta {
    pub fn new(ts: Timestamp, is_deleted: bool) -> Self {
        Self { ts, is_deleted }
    }
}
