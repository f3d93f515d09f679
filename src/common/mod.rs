//! Shared identifiers and tuning constants used across every layer of the
//! storage engine: page/frame/transaction ids, the page size, and the
//! timestamp split point that distinguishes commit timestamps from
//! in-flight transaction ids.

pub mod rid;
pub mod value;

pub use rid::Rid;
pub use value::Value;

/// Size in bytes of every on-disk page and in-memory frame.
pub const PAGE_SIZE: usize = 4096;

/// Sentinel for "no page" (e.g. an empty directory/bucket slot).
pub const INVALID_PAGE_ID: i64 = -1;

/// Sentinel for "no frame currently holds this page".
pub const INVALID_FRAME_ID: i32 = -1;

/// Sentinel transaction id for reads that are not part of any transaction.
pub const INVALID_TXN_ID: u64 = 0;

/// First id handed out by the transaction id counter. Timestamps below this
/// value are commit timestamps; at or above it, they identify an in-flight
/// writer. Tuple metadata overlays the two spaces onto one field.
pub const TXN_START_ID: u64 = 1 << 62;

/// Default K for the LRU-K replacer used by the buffer pool.
pub const LRUK_REPLACER_K: usize = 2;

pub type PageId = i64;
pub type FrameId = i32;
pub type TxnId = u64;
pub type Timestamp = u64;

/// Table/index identifiers handed out by the catalog.
pub type TableOid = u32;
pub type IndexOid = u32;

/// A tuple as it moves through the execution engine: one `Value` per
/// column of whatever schema the producing operator advertises.
pub type Tuple = Vec<Value>;

/// Returns whether `ts` identifies an in-progress transaction rather than a
/// committed timestamp.
pub fn is_txn_id(ts: Timestamp) -> bool {
    ts >= TXN_START_ID
}
