//! Multi-version concurrency control: transaction lifecycle, per-tuple
//! undo-log chains, snapshot reconstruction, write-write conflict
//! detection, and garbage collection.

pub mod manager;
pub mod transaction;
pub mod tuple_meta;
pub mod undo_log;
pub mod watermark;

pub use manager::{TransactionManager, WriteCheck};
pub use transaction::{IsolationLevel, Transaction, TransactionState};
pub use tuple_meta::TupleMeta;
pub use undo_log::{UndoLink, UndoLog};
pub use watermark::Watermark;
