//! Asynchronous (from the caller's point of view) disk I/O.
//!
//! A single background thread drains a FIFO queue of read/write requests
//! against the `DiskManager`. Callers get a completion handle back
//! immediately and block on it only when they actually need the result,
//! which is what lets the buffer pool overlap request submission with
//! other bookkeeping. Shutdown is a sentinel `None` pushed onto the same
//! queue so the worker's `recv` loop terminates and joins cleanly.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::common::{PageId, PAGE_SIZE};
use crate::storage::disk_manager::DiskManager;
use crate::storage::page::Page;

/// The promise half of a disk request: resolves to `true` on success.
/// Fulfilled exactly once, by the worker thread.
pub type Completion = Sender<bool>;
/// The future half; blocks until the worker fulfils the matching promise.
pub type CompletionWaiter = Receiver<bool>;

pub struct DiskRequest {
    pub is_write: bool,
    pub page_id: PageId,
    pub page: Page,
    pub completion: Completion,
}

impl DiskRequest {
    pub fn read(page_id: PageId, page: Page) -> (Self, CompletionWaiter) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                is_write: false,
                page_id,
                page,
                completion: tx,
            },
            rx,
        )
    }

    pub fn write(page_id: PageId, page: Page) -> (Self, CompletionWaiter) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                is_write: true,
                page_id,
                page,
                completion: tx,
            },
            rx,
        )
    }
}

pub struct DiskScheduler {
    sender: Sender<Option<DiskRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver): (Sender<Option<DiskRequest>>, Receiver<Option<DiskRequest>>) =
            mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("disk-scheduler".into())
            .spawn(move || Self::worker_loop(receiver, disk_manager))
            .expect("failed to spawn disk scheduler worker");
        Self {
            sender,
            worker: Some(worker),
        }
    }

    fn worker_loop(receiver: Receiver<Option<DiskRequest>>, disk_manager: Arc<DiskManager>) {
        while let Ok(Some(request)) = receiver.recv() {
            let success = if request.is_write {
                let bytes = request.page.copy_to_vec();
                let mut buf = [0u8; PAGE_SIZE];
                buf.copy_from_slice(&bytes);
                disk_manager.write_page(request.page_id, &buf).is_ok()
            } else {
                let mut buf = [0u8; PAGE_SIZE];
                let ok = disk_manager.read_page(request.page_id, &mut buf).is_ok();
                if ok {
                    request.page.copy_from_slice(&buf);
                }
                ok
            };
            // The receiver may have stopped waiting (e.g. caller dropped
            // the waiter); that is not a scheduler error.
            let _ = request.completion.send(success);
        }
    }

    /// Enqueues a request. Submission order is preserved: requests from the
    /// same caller are serviced FIFO by the single worker thread.
    pub fn schedule(&self, request: DiskRequest) {
        self.sender
            .send(Some(request))
            .expect("disk scheduler worker thread is gone");
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        let _ = self.sender.send(None);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
