//! Tracks the minimum live read timestamp across all in-flight
//! transactions. Undo log entries older than the watermark can never be
//! visible to any current or future reader and become garbage-collectible.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::common::Timestamp;
use crate::error::{DbError, Result};

struct Inner {
    current_reads: HashMap<Timestamp, usize>,
    watermark: Timestamp,
}

pub struct Watermark {
    inner: Mutex<Inner>,
}

impl Watermark {
    pub fn new(commit_ts: Timestamp) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current_reads: HashMap::new(),
                watermark: commit_ts,
            }),
        }
    }

    pub fn add_txn(&self, read_ts: Timestamp, commit_ts: Timestamp) -> Result<()> {
        if read_ts < commit_ts {
            return Err(DbError::Internal("read_ts < commit_ts".into()));
        }
        let mut inner = self.inner.lock();
        *inner.current_reads.entry(read_ts).or_insert(0) += 1;
        Ok(())
    }

    /// Removes one reader at `read_ts`, then advances the watermark past
    /// any prefix of timestamps with no remaining live reader, capped at
    /// `commit_ts` (the largest timestamp ever observed committed).
    pub fn remove_txn(&self, read_ts: Timestamp, commit_ts: Timestamp) {
        let mut inner = self.inner.lock();
        if let Some(count) = inner.current_reads.get_mut(&read_ts) {
            *count -= 1;
            if *count == 0 {
                inner.current_reads.remove(&read_ts);
            }
        }
        while inner.watermark != commit_ts && !inner.current_reads.contains_key(&inner.watermark) {
            inner.watermark += 1;
        }
    }

    pub fn get(&self) -> Timestamp {
        self.inner.lock().watermark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_past_departed_readers() {
        let wm = Watermark::new(0);
        wm.add_txn(1, 0).unwrap();
        wm.add_txn(2, 0).unwrap();
        wm.add_txn(3, 0).unwrap();
        assert_eq!(wm.get(), 0);
        wm.remove_txn(1, 3);
        assert_eq!(wm.get(), 2);
        wm.remove_txn(2, 3);
        assert_eq!(wm.get(), 3);
    }

    #[test]
    fn stalls_while_the_oldest_reader_is_still_live() {
        let wm = Watermark::new(0);
        wm.add_txn(1, 0).unwrap();
        wm.add_txn(3, 0).unwrap();
        // Timestamp 2 was never registered, but the watermark can't pass
        // timestamp 1 while that reader is still outstanding.
        assert_eq!(wm.get(), 0);
        wm.remove_txn(3, 3);
        assert_eq!(wm.get(), 0);
    }
}
