//! The in-memory representation of a buffer-pool frame's payload.
//!
//! A `Page` is a cheap, cloneable handle (an `Arc` underneath) onto a fixed
//! `PAGE_SIZE` byte buffer plus its identity (`page_id`), pin count, dirty
//! flag, and reader-writer latch. The buffer pool owns one `Page` per frame
//! for the lifetime of the pool; fetching/unpinning only touches the
//! identity fields, while payload access goes through the latch.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, INVALID_PAGE_ID, PAGE_SIZE};

struct PageInner {
    page_id: AtomicI64,
    pin_count: AtomicI64,
    is_dirty: AtomicBool,
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

/// A handle to one buffer-pool frame. Cloning a `Page` clones the handle,
/// not the payload; every clone observes the same underlying frame.
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

impl Page {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PageInner {
                page_id: AtomicI64::new(INVALID_PAGE_ID),
                pin_count: AtomicI64::new(0),
                is_dirty: AtomicBool::new(false),
                data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
            }),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id.load(Ordering::Acquire)
    }

    pub fn set_page_id(&self, page_id: PageId) {
        self.inner.page_id.store(page_id, Ordering::Release);
    }

    pub fn pin_count(&self) -> i64 {
        self.inner.pin_count.load(Ordering::Acquire)
    }

    pub fn pin(&self) {
        self.inner.pin_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the pin count, returning the value after the decrement.
    pub fn unpin(&self) -> i64 {
        self.inner.pin_count.fetch_sub(1, Ordering::AcqRel) - 1
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty.load(Ordering::Acquire)
    }

    pub fn set_dirty(&self, dirty: bool) {
        // Never clears the dirty bit implicitly; callers that want to clear
        // it (e.g. after a flush) do so explicitly.
        if dirty {
            self.inner.is_dirty.store(true, Ordering::Release);
        } else {
            self.inner.is_dirty.store(false, Ordering::Release);
        }
    }

    /// Resets identity and payload to the "free frame" state. Only safe to
    /// call while the frame is not resident in the page table.
    pub fn reset(&self) {
        self.inner.page_id.store(INVALID_PAGE_ID, Ordering::Release);
        self.inner.pin_count.store(0, Ordering::Release);
        self.inner.is_dirty.store(false, Ordering::Release);
        self.inner.data.write().unwrap().fill(0);
    }

    pub fn read_latch(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.inner.data.read().unwrap()
    }

    pub fn write_latch(&self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.inner.data.write().unwrap()
    }

    /// Copies bytes into the page's payload without going through the
    /// latch API; used by the disk scheduler, which owns exclusive access
    /// to the frame while a read/write is outstanding.
    pub fn copy_from_slice(&self, bytes: &[u8]) {
        let mut guard = self.inner.data.write().unwrap();
        guard[..bytes.len().min(PAGE_SIZE)].copy_from_slice(&bytes[..bytes.len().min(PAGE_SIZE)]);
    }

    pub fn copy_to_vec(&self) -> Vec<u8> {
        self.inner.data.read().unwrap().to_vec()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}
