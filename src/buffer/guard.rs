//! RAII page guards.
//!
//! A `BasicPageGuard` pins a page on acquisition and unpins it on drop. A
//! `ReadPageGuard`/`WritePageGuard` additionally hold the page's reader or
//! writer latch for their lifetime, releasing it before the unpin happens.
//! Guards are move-only: dropping the source of a move must not also unpin,
//! so every guard carries an `Option` that a move empties out.

use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::pool::BufferPoolManager;
use crate::common::{PageId, PAGE_SIZE};
use crate::storage::page::Page;

/// Owns a pin on `page` for as long as it lives. Never copyable: dropping a
/// guard unconditionally unpins, so two guards over the same pin would
/// double-unpin.
pub struct BasicPageGuard<'a> {
    bpm: &'a BufferPoolManager,
    page: Option<Page>,
    is_dirty: bool,
}

impl<'a> BasicPageGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, page: Page) -> Self {
        Self {
            bpm,
            page: Some(page),
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page.as_ref().expect("guard is empty").page_id()
    }

    pub fn read(&self) -> PageReadView<'_> {
        let page = self.page.as_ref().expect("guard is empty");
        PageReadView {
            guard: page.read_latch(),
        }
    }

    pub fn write(&mut self) -> PageWriteView<'_> {
        self.is_dirty = true;
        let page = self.page.as_ref().expect("guard is empty");
        PageWriteView {
            guard: page.write_latch(),
        }
    }

    pub fn upgrade_read(mut self) -> ReadPageGuard<'a> {
        let page = self.page.take().expect("guard is empty");
        let bpm = self.bpm;
        ReadPageGuard::new(bpm, page)
    }

    pub fn upgrade_write(mut self) -> WritePageGuard<'a> {
        let page = self.page.take().expect("guard is empty");
        let bpm = self.bpm;
        WritePageGuard::new(bpm, page)
    }
}

impl Drop for BasicPageGuard<'_> {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            self.bpm.unpin_page(page.page_id(), self.is_dirty);
        }
    }
}

pub struct PageReadView<'a> {
    guard: RwLockReadGuard<'a, Box<[u8; PAGE_SIZE]>>,
}

impl std::ops::Deref for PageReadView<'_> {
    type Target = [u8; PAGE_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

pub struct PageWriteView<'a> {
    guard: RwLockWriteGuard<'a, Box<[u8; PAGE_SIZE]>>,
}

impl std::ops::Deref for PageWriteView<'_> {
    type Target = [u8; PAGE_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl std::ops::DerefMut for PageWriteView<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

/// A page pinned and read-latched for its whole lifetime.
pub struct ReadPageGuard<'a> {
    bpm: &'a BufferPoolManager,
    page: Option<Page>,
}

impl<'a> ReadPageGuard<'a> {
    fn new(bpm: &'a BufferPoolManager, page: Page) -> Self {
        Self {
            bpm,
            page: Some(page),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page.as_ref().expect("guard is empty").page_id()
    }

    pub fn read(&self) -> PageReadView<'_> {
        let page = self.page.as_ref().expect("guard is empty");
        PageReadView {
            guard: page.read_latch(),
        }
    }
}

impl Drop for ReadPageGuard<'_> {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            // The latch was only borrowed through `read()`, never held
            // across the drop, so releasing it is implicit; only the pin
            // needs an explicit release here.
            self.bpm.unpin_page(page.page_id(), false);
        }
    }
}

/// A page pinned and write-latched for its whole lifetime. Any access to
/// the payload marks the page dirty at drop time.
pub struct WritePageGuard<'a> {
    bpm: &'a BufferPoolManager,
    page: Option<Page>,
}

impl<'a> WritePageGuard<'a> {
    fn new(bpm: &'a BufferPoolManager, page: Page) -> Self {
        Self {
            bpm,
            page: Some(page),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page.as_ref().expect("guard is empty").page_id()
    }

    pub fn read(&self) -> PageReadView<'_> {
        let page = self.page.as_ref().expect("guard is empty");
        PageReadView {
            guard: page.read_latch(),
        }
    }

    pub fn write(&mut self) -> PageWriteView<'_> {
        let page = self.page.as_ref().expect("guard is empty");
        PageWriteView {
            guard: page.write_latch(),
        }
    }
}

impl Drop for WritePageGuard<'_> {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            self.bpm.unpin_page(page.page_id(), true);
        }
    }
}
