//! RustyDB core: the on-disk storage and execution substrate an SQL-like
//! query processor runs on top of. Bottom to top: a disk scheduler and
//! buffer pool with an LRU-K replacer, an on-disk extendible hash index,
//! an MVCC transaction manager with snapshot reads, and a Volcano-model
//! execution engine with a couple of rule-based plan rewrites.
//!
//! SQL parsing, the binder, logging/recovery, and networking are external
//! collaborators this crate does not implement; it is consumed as a
//! library by whatever sits above it.

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod error;
pub mod execution;
pub mod index;
pub mod storage;
pub mod transaction;

pub use error::{DbError, Result};

use std::sync::Arc;

use buffer::BufferPoolManager;
use catalog::Catalog;
use storage::DiskManager;
use transaction::{IsolationLevel, Transaction, TransactionManager};

/// Tuning knobs for a [`Database`] instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the single backing file the disk manager reads/writes
    /// fixed `PAGE_SIZE` blocks against.
    pub data_dir: String,
    pub buffer_pool_size: usize,
    /// `K` for the buffer pool's LRU-K replacer; must be >= 2.
    pub lru_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "./data/rustydb.db".to_string(),
            buffer_pool_size: 1000,
            lru_k: common::LRUK_REPLACER_K,
        }
    }
}

/// Wires together the buffer pool, catalog, and transaction manager —
/// the whole of what this crate provides — behind one handle. A binder
/// and executor built above this crate borrows `catalog()` to resolve
/// table/index names and `txn_manager()` to begin/commit/abort.
pub struct Database {
    bpm: Arc<BufferPoolManager>,
    catalog: Arc<Catalog>,
    txn_manager: Arc<TransactionManager>,
}

impl Database {
    pub fn open(config: Config) -> Result<Self> {
        let disk_manager = Arc::new(DiskManager::new(&config.data_dir)?);
        let bpm = Arc::new(BufferPoolManager::with_k(
            config.buffer_pool_size,
            disk_manager,
            config.lru_k,
        ));
        let catalog = Arc::new(Catalog::new(bpm.clone()));
        let txn_manager = Arc::new(TransactionManager::new(catalog.clone()));
        Ok(Self {
            bpm,
            catalog,
            txn_manager,
        })
    }

    /// An ephemeral instance backed by a temp file, for tests.
    pub fn open_temp(buffer_pool_size: usize) -> Result<Self> {
        let disk_manager = Arc::new(DiskManager::new_temp()?);
        let bpm = Arc::new(BufferPoolManager::new(buffer_pool_size, disk_manager));
        let catalog = Arc::new(Catalog::new(bpm.clone()));
        let txn_manager = Arc::new(TransactionManager::new(catalog.clone()));
        Ok(Self {
            bpm,
            catalog,
            txn_manager,
        })
    }

    pub fn bpm(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn txn_manager(&self) -> &Arc<TransactionManager> {
        &self.txn_manager
    }

    pub fn begin(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        self.txn_manager.begin(isolation_level)
    }
}
