//! Table and index metadata, external to the storage engine proper per the
//! design (SQL binding resolves names to the oids used here), but the
//! minimal surface the execution engine needs: schemas, table handles, and
//! index handles addressable by oid or by name.

pub mod table_heap;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::buffer::pool::BufferPoolManager;
use crate::common::rid::Rid;
use crate::common::{IndexOid, TableOid, Value};
use crate::error::{DbError, Result};
use crate::index::ExtendibleHashTable;

pub use table_heap::TableHeap;

/// The column types `Value` can hold; kept in lockstep with
/// `common::value::Value`'s variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataType {
    Boolean,
    Integer,
    Varchar,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A table or intermediate operator's output shape: an ordered list of
/// named, typed columns. Tuples produced against a `Schema` carry exactly
/// one `Value` per column, in column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Schema {
    pub columns: Vec<Column>,
}

/// A JSON-serializable snapshot of every table's name and schema, for
/// persisting catalog metadata alongside the heap/index pages a
/// `DiskManager` already owns. Tables and indexes themselves are rebuilt
/// by the binder re-running `create_table`/`create_index` against the
/// recovered schema; this snapshot only carries the shape, not the data.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogSnapshot {
    pub tables: Vec<(String, Schema)>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// A resident table: its schema and the heap holding its rows.
pub struct TableInfo {
    pub oid: TableOid,
    pub name: String,
    pub schema: Arc<Schema>,
    pub table: Arc<TableHeap>,
}

/// An index over a table: which columns it's keyed on (`key_attrs`,
/// positions into the table's schema) and the on-disk structure itself.
pub struct IndexInfo {
    pub index_oid: IndexOid,
    pub name: String,
    pub table_name: String,
    pub key_schema: Arc<Schema>,
    pub key_attrs: Vec<usize>,
    pub index: Arc<ExtendibleHashTable>,
    pub is_primary_key: bool,
}

impl IndexInfo {
    /// Projects a table row down to this index's key tuple.
    pub fn key_from_tuple(&self, tuple: &[Value]) -> Value {
        // The reference hash index is single-column; a composite key would
        // need a compound `Value` variant the spec's black-box value type
        // doesn't define, so multi-column indexes aren't supported here.
        tuple[self.key_attrs[0]].clone()
    }
}

struct CatalogState {
    tables_by_name: HashMap<String, TableOid>,
    tables: HashMap<TableOid, Arc<TableInfo>>,
    table_indexes: HashMap<String, Vec<IndexOid>>,
    indexes: HashMap<IndexOid, Arc<IndexInfo>>,
}

/// Table/index metadata by name or oid. `GetTable`/`GetIndex`/
/// `GetTableIndexes` are the external interfaces the execution engine
/// consumes; creation is exposed for tests and for whatever binder sits
/// above this layer.
pub struct Catalog {
    bpm: Arc<BufferPoolManager>,
    next_table_oid: AtomicU32,
    next_index_oid: AtomicU32,
    state: RwLock<CatalogState>,
}

impl Catalog {
    pub fn new(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            bpm,
            next_table_oid: AtomicU32::new(0),
            next_index_oid: AtomicU32::new(0),
            state: RwLock::new(CatalogState {
                tables_by_name: HashMap::new(),
                tables: HashMap::new(),
                table_indexes: HashMap::new(),
                indexes: HashMap::new(),
            }),
        }
    }

    pub fn create_table(&self, name: &str, schema: Schema) -> Result<Arc<TableInfo>> {
        let mut state = self.state.write();
        if state.tables_by_name.contains_key(name) {
            return Err(DbError::AlreadyExists(format!("table {name}")));
        }
        let oid = self.next_table_oid.fetch_add(1, Ordering::SeqCst);
        let info = Arc::new(TableInfo {
            oid,
            name: name.to_string(),
            schema: Arc::new(schema),
            table: Arc::new(TableHeap::new()),
        });
        state.tables_by_name.insert(name.to_string(), oid);
        state.tables.insert(oid, info.clone());
        state.table_indexes.insert(name.to_string(), Vec::new());
        Ok(info)
    }

    pub fn get_table(&self, oid: TableOid) -> Option<Arc<TableInfo>> {
        self.state.read().tables.get(&oid).cloned()
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        let state = self.state.read();
        let oid = state.tables_by_name.get(name)?;
        state.tables.get(oid).cloned()
    }

    pub fn all_tables(&self) -> Vec<Arc<TableInfo>> {
        self.state.read().tables.values().cloned().collect()
    }

    /// `key_attrs` are positions into the table's schema that make up the
    /// index key, in key-column order. The reference hash index only
    /// supports a single-column key (see `IndexInfo::key_from_tuple`).
    pub fn create_index(
        &self,
        name: &str,
        table_name: &str,
        key_attrs: Vec<usize>,
        is_primary_key: bool,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Result<Arc<IndexInfo>> {
        let mut state = self.state.write();
        let table_oid = *state
            .tables_by_name
            .get(table_name)
            .ok_or_else(|| DbError::NotFound(format!("table {table_name}")))?;
        let table = state.tables[&table_oid].clone();
        let key_schema = Arc::new(Schema::new(
            key_attrs
                .iter()
                .map(|&i| table.schema.column(i).clone())
                .collect(),
        ));
        let index = Arc::new(ExtendibleHashTable::new(
            self.bpm.clone(),
            header_max_depth,
            directory_max_depth,
            bucket_max_size,
        )?);
        let oid = self.next_index_oid.fetch_add(1, Ordering::SeqCst);
        let info = Arc::new(IndexInfo {
            index_oid: oid,
            name: name.to_string(),
            table_name: table_name.to_string(),
            key_schema,
            key_attrs,
            index,
            is_primary_key,
        });
        state.indexes.insert(oid, info.clone());
        state
            .table_indexes
            .entry(table_name.to_string())
            .or_default()
            .push(oid);
        Ok(info)
    }

    pub fn get_index(&self, oid: IndexOid) -> Option<Arc<IndexInfo>> {
        self.state.read().indexes.get(&oid).cloned()
    }

    pub fn get_table_indexes(&self, table_name: &str) -> Vec<Arc<IndexInfo>> {
        let state = self.state.read();
        state
            .table_indexes
            .get(table_name)
            .map(|oids| oids.iter().filter_map(|o| state.indexes.get(o).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn primary_index(&self, table_name: &str) -> Option<Arc<IndexInfo>> {
        self.get_table_indexes(table_name)
            .into_iter()
            .find(|i| i.is_primary_key)
    }

    /// Deletes a row's entries from every index over its table, used by
    /// `Delete` and `Update` (the latter as half of a delete+insert).
    pub fn remove_from_indexes(&self, table_name: &str, tuple: &[Value]) {
        for index in self.get_table_indexes(table_name) {
            let key = index.key_from_tuple(tuple);
            let _ = index.index.remove(&key);
        }
    }

    pub fn insert_into_indexes(&self, table_name: &str, tuple: &[Value], rid: Rid) -> Result<()> {
        for index in self.get_table_indexes(table_name) {
            let key = index.key_from_tuple(tuple);
            index.index.insert(key, rid)?;
        }
        Ok(())
    }

    /// A point-in-time snapshot of table names and schemas, for writing to
    /// a `catalog.json` sidecar file next to the data file.
    pub fn snapshot(&self) -> CatalogSnapshot {
        let state = self.state.read();
        CatalogSnapshot {
            tables: state
                .tables
                .values()
                .map(|t| (t.name.clone(), (*t.schema).clone()))
                .collect(),
        }
    }

    /// Serializes [`Catalog::snapshot`] as pretty JSON, easy to diff and
    /// hand-edit.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| DbError::Internal(format!("catalog serialization failed: {e}")))
    }

    /// Recreates empty tables from a previously-saved [`CatalogSnapshot`].
    /// Indexes are not part of the snapshot and must be rebuilt separately
    /// by whatever layer tracks which columns were indexed.
    pub fn restore_from_json(&self, json: &str) -> Result<()> {
        let snapshot: CatalogSnapshot =
            serde_json::from_str(json).map_err(|e| DbError::Internal(format!("catalog deserialization failed: {e}")))?;
        for (name, schema) in snapshot.tables {
            self.create_table(&name, schema)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DiskManager;

    fn catalog() -> Catalog {
        let disk = Arc::new(DiskManager::new_temp().unwrap());
        Catalog::new(Arc::new(BufferPoolManager::new(16, disk)))
    }

    #[test]
    fn json_round_trip_recreates_table_schemas() {
        let catalog = catalog();
        catalog
            .create_table("users", Schema::new(vec![Column::new("id", DataType::Integer)]))
            .unwrap();
        let json = catalog.to_json().unwrap();

        let restored = Catalog::new(Arc::new(BufferPoolManager::new(
            16,
            Arc::new(DiskManager::new_temp().unwrap()),
        )));
        restored.restore_from_json(&json).unwrap();

        let table = restored.get_table_by_name("users").unwrap();
        assert_eq!(table.schema.columns, vec![Column::new("id", DataType::Integer)]);
    }
}
