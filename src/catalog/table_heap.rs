//! A minimal tuple store keyed by `Rid`. Real tuple encoding, slotted
//! pages, and on-disk layout are external collaborators per the design;
//! this gives the execution engine and transaction manager something
//! concrete to scan, insert into, and mutate in place.

use parking_lot::RwLock;

use crate::common::rid::Rid;
use crate::common::Value;
use crate::transaction::tuple_meta::TupleMeta;

pub struct TableHeap {
    rows: RwLock<Vec<Option<(TupleMeta, Vec<Value>)>>>,
}

impl TableHeap {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Appends a new row, returning its `Rid`. Inserts never reuse a
    /// slot: MVCC needs every RID's identity stable for the lifetime of
    /// the heap so undo chains keep addressing the right row.
    pub fn insert_tuple(&self, meta: TupleMeta, tuple: Vec<Value>) -> Rid {
        let mut rows = self.rows.write();
        let slot = rows.len() as u32;
        rows.push(Some((meta, tuple)));
        Rid::new(0, slot)
    }

    pub fn get_tuple(&self, rid: Rid) -> Option<(TupleMeta, Vec<Value>)> {
        self.rows.read().get(rid.slot_num() as usize).cloned().flatten()
    }

    pub fn update_tuple_meta(&self, rid: Rid, meta: TupleMeta) {
        let mut rows = self.rows.write();
        if let Some(Some((m, _))) = rows.get_mut(rid.slot_num() as usize) {
            *m = meta;
        }
    }

    /// Overwrites both the metadata and the tuple payload in place,
    /// without allocating a new slot. Used by `Update`.
    pub fn update_tuple_in_place(&self, rid: Rid, meta: TupleMeta, tuple: Vec<Value>) {
        let mut rows = self.rows.write();
        if let Some(slot) = rows.get_mut(rid.slot_num() as usize) {
            *slot = Some((meta, tuple));
        }
    }

    /// Every RID ever allocated, including tombstoned ones — visibility
    /// filtering happens above this layer.
    pub fn all_rids(&self) -> Vec<Rid> {
        let rows = self.rows.read();
        (0..rows.len())
            .filter(|&i| rows[i].is_some())
            .map(|i| Rid::new(0, i as u32))
            .collect()
    }
}

impl Default for TableHeap {
    fn default() -> Self {
        Self::new()
    }
}
