//! The buffer pool: frame allocation, pinning, dirty writeback, the LRU-K
//! eviction policy, and RAII page guards built on top of it.

pub mod guard;
pub mod lru_k;
pub mod pool;

pub use guard::{BasicPageGuard, PageReadView, PageWriteView, ReadPageGuard, WritePageGuard};
pub use lru_k::LruKReplacer;
pub use pool::BufferPoolManager;
