//! File-backed page storage.
//!
//! Reads and writes fixed `PAGE_SIZE` blocks at `page_id * PAGE_SIZE`
//! offsets in a single backing file. Reading a page that was never written
//! returns a zeroed image rather than an error, matching the "no record"
//! behavior the disk scheduler contract expects.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::common::{PageId, PAGE_SIZE};
use crate::error::Result;

pub struct DiskManager {
    file: Mutex<File>,
}

impl DiskManager {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// An in-memory-only disk manager backed by a temp file, handy for
    /// tests that don't care where the bytes land.
    pub fn new_temp() -> Result<Self> {
        let path = std::env::temp_dir().join(format!(
            "rustydb-{}-{}.db",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        Self::new(path)
    }

    pub fn read_page(&self, page_id: PageId, out: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        let offset = page_id as u64 * PAGE_SIZE as u64;
        let len = file.metadata()?.len();
        if offset >= len {
            out.fill(0);
            return Ok(());
        }
        file.seek(SeekFrom::Start(offset))?;
        out.fill(0);
        let _ = file.read(out)?;
        Ok(())
    }

    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        let offset = page_id as u64 * PAGE_SIZE as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }
}
