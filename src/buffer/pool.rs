//! The buffer pool manager: owns a fixed array of frames, a free list, a
//! page table, and an LRU-K replacer; serves `NewPage`/`FetchPage`/
//! `UnpinPage`/`FlushPage`/`DeletePage` and issues writeback through the
//! disk scheduler.
//!
//! One mutex (`state`) serializes metadata: the page table, the free list,
//! and page-id allocation. Payload access is serialized separately by each
//! page's own reader-writer latch, so two threads can read/write different
//! resident pages without contending on `state` at all.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::guard::{BasicPageGuard, ReadPageGuard, WritePageGuard};
use crate::buffer::lru_k::LruKReplacer;
use crate::common::{FrameId, PageId, INVALID_PAGE_ID, LRUK_REPLACER_K};
use crate::storage::disk_manager::DiskManager;
use crate::storage::disk_scheduler::{DiskRequest, DiskScheduler};
use crate::storage::page::Page;

struct State {
    page_table: HashMap<PageId, FrameId>,
    free_list: Vec<FrameId>,
    next_page_id: PageId,
    free_page_ids: Vec<PageId>,
}

pub struct BufferPoolManager {
    pool_size: usize,
    pages: Vec<Page>,
    replacer: LruKReplacer,
    disk_scheduler: DiskScheduler,
    state: Mutex<State>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        Self::with_k(pool_size, disk_manager, LRUK_REPLACER_K)
    }

    pub fn with_k(pool_size: usize, disk_manager: Arc<DiskManager>, replacer_k: usize) -> Self {
        Self {
            pool_size,
            pages: (0..pool_size).map(|_| Page::new()).collect(),
            replacer: LruKReplacer::new(pool_size, replacer_k),
            disk_scheduler: DiskScheduler::new(disk_manager),
            state: Mutex::new(State {
                page_table: HashMap::new(),
                free_list: (0..pool_size as FrameId).rev().collect(),
                next_page_id: 0,
                free_page_ids: Vec::new(),
            }),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    fn allocate_page_id(state: &mut State) -> PageId {
        if let Some(id) = state.free_page_ids.pop() {
            return id;
        }
        let id = state.next_page_id;
        state.next_page_id += 1;
        id
    }

    /// Acquires a frame for a brand-new page identity: free list first,
    /// then eviction (writing back a dirty victim first). Returns `None`
    /// if neither source has a frame to offer.
    fn acquire_frame(&self, state: &mut State) -> Option<FrameId> {
        if let Some(frame_id) = state.free_list.pop() {
            return Some(frame_id);
        }
        let frame_id = self.replacer.evict()?;
        let victim = &self.pages[frame_id as usize];
        tracing::trace!(page_id = victim.page_id(), frame_id, dirty = victim.is_dirty(), "evicting frame");
        if victim.is_dirty() {
            self.flush_frame(victim);
        }
        state.page_table.remove(&victim.page_id());
        victim.reset();
        Some(frame_id)
    }

    fn flush_frame(&self, page: &Page) {
        let (request, waiter) = DiskRequest::write(page.page_id(), page.clone());
        self.disk_scheduler.schedule(request);
        let _ = waiter.recv();
    }

    fn read_frame(&self, page: &Page) {
        let (request, waiter) = DiskRequest::read(page.page_id(), page.clone());
        self.disk_scheduler.schedule(request);
        let _ = waiter.recv();
    }

    /// Allocates a new page and returns a pinned handle to it, or `None` if
    /// the pool has no free frame and nothing evictable.
    pub fn new_page(&self) -> Option<Page> {
        let mut state = self.state.lock();
        let Some(frame_id) = self.acquire_frame(&mut state) else {
            tracing::warn!("buffer pool exhausted: no free frame and nothing evictable");
            return None;
        };
        let page_id = Self::allocate_page_id(&mut state);
        let page = &self.pages[frame_id as usize];
        page.set_page_id(page_id);
        page.pin();
        state.page_table.insert(page_id, frame_id);
        drop(state);
        self.replacer.record_access(frame_id).ok();
        self.replacer.set_evictable(frame_id, false).ok();
        Some(page.clone())
    }

    pub fn new_page_guarded(&self) -> Option<BasicPageGuard<'_>> {
        self.new_page().map(|p| BasicPageGuard::new(self, p))
    }

    /// Fetches `page_id`, pinning it and returning a handle. Resident pages
    /// short-circuit straight to a pin; misses acquire a frame and read
    /// through the disk scheduler.
    pub fn fetch_page(&self, page_id: PageId) -> Option<Page> {
        let mut state = self.state.lock();
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let page = &self.pages[frame_id as usize];
            page.pin();
            drop(state);
            self.replacer.record_access(frame_id).ok();
            self.replacer.set_evictable(frame_id, false).ok();
            return Some(page.clone());
        }

        let frame_id = self.acquire_frame(&mut state)?;
        let page = &self.pages[frame_id as usize];
        page.set_page_id(page_id);
        page.pin();
        state.page_table.insert(page_id, frame_id);
        drop(state);
        self.read_frame(page);
        self.replacer.record_access(frame_id).ok();
        self.replacer.set_evictable(frame_id, false).ok();
        Some(page.clone())
    }

    pub fn fetch_page_basic(&self, page_id: PageId) -> Option<BasicPageGuard<'_>> {
        self.fetch_page(page_id).map(|p| BasicPageGuard::new(self, p))
    }

    pub fn fetch_page_read(&self, page_id: PageId) -> Option<ReadPageGuard<'_>> {
        self.fetch_page_basic(page_id).map(|g| g.upgrade_read())
    }

    pub fn fetch_page_write(&self, page_id: PageId) -> Option<WritePageGuard<'_>> {
        self.fetch_page_basic(page_id).map(|g| g.upgrade_write())
    }

    /// Decrements the pin count; once it reaches zero the frame becomes
    /// evictable. Returns `false` if the page isn't resident or its pin
    /// count was already zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        let page = &self.pages[frame_id as usize];
        if page.pin_count() <= 0 {
            return false;
        }
        drop(state);
        if is_dirty {
            page.set_dirty(true);
        }
        if page.unpin() == 0 {
            self.replacer.set_evictable(frame_id, true).ok();
        }
        true
    }

    pub fn flush_page(&self, page_id: PageId) -> bool {
        let state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        let page = self.pages[frame_id as usize].clone();
        drop(state);
        self.flush_frame(&page);
        page.set_dirty(false);
        true
    }

    pub fn flush_all_pages(&self) {
        let state = self.state.lock();
        let page_ids: Vec<PageId> = state.page_table.keys().copied().collect();
        drop(state);
        for page_id in page_ids {
            self.flush_page(page_id);
        }
    }

    /// Deletes a page from the pool (not from disk). Fails if it's still
    /// pinned; succeeds as a no-op if it was never resident.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return true;
        };
        let page = &self.pages[frame_id as usize];
        if page.pin_count() > 0 {
            return false;
        }
        state.page_table.remove(&page_id);
        state.free_page_ids.push(page_id);
        state.free_list.push(frame_id);
        drop(state);
        self.replacer.remove(frame_id).ok();
        page.reset();
        true
    }
}

impl Drop for BufferPoolManager {
    fn drop(&mut self) {
        self.flush_all_pages();
    }
}
