//! On-disk extendible hashing: header page selects a directory by the
//! high bits of the key's hash, the directory selects a bucket by the low
//! bits, and the bucket holds the key/value entries. Insert grows the
//! structure by splitting a full bucket (and, if needed, doubling the
//! directory first); delete shrinks it by merging empty buckets back into
//! their split image and halving the directory when it becomes possible.

use std::sync::Arc;

use crate::buffer::pool::BufferPoolManager;
use crate::common::rid::Rid;
use crate::common::{PageId, Value, INVALID_PAGE_ID};
use crate::error::{DbError, Result};
use crate::index::hash_table_page::{hash_value, BucketPage, DirectoryPage, HeaderPage};

pub struct ExtendibleHashTable {
    bpm: Arc<BufferPoolManager>,
    header_page_id: PageId,
    header_max_depth: u32,
    directory_max_depth: u32,
    bucket_max_size: u32,
}

impl ExtendibleHashTable {
    pub fn new(
        bpm: Arc<BufferPoolManager>,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Result<Self> {
        let guard = bpm
            .new_page_guarded()
            .ok_or(DbError::ResourceExhausted("no frame for hash table header page".into()))?;
        let header_page_id = guard.page_id();
        let header = HeaderPage::new(header_max_depth);
        {
            let mut guard = guard;
            header.encode(&mut guard.write());
        }
        Ok(Self {
            bpm,
            header_page_id,
            header_max_depth,
            directory_max_depth,
            bucket_max_size,
        })
    }

    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    fn hash(key: &Value) -> u32 {
        hash_value(key)
    }

    pub fn get_value(&self, key: &Value) -> Option<Rid> {
        let hash = Self::hash(key);

        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        let header = HeaderPage::decode(&header_guard.read());
        let dir_idx = header.hash_to_directory_index(hash);
        let directory_page_id = header.directory_page_id(dir_idx);
        drop(header_guard);
        if directory_page_id == INVALID_PAGE_ID {
            return None;
        }

        let dir_guard = self.bpm.fetch_page_read(directory_page_id)?;
        let directory = DirectoryPage::decode(&dir_guard.read());
        let bucket_idx = directory.hash_to_bucket_index(hash);
        let bucket_page_id = directory.bucket_page_id(bucket_idx);
        drop(dir_guard);
        if bucket_page_id == INVALID_PAGE_ID {
            return None;
        }

        let bucket_guard = self.bpm.fetch_page_read(bucket_page_id)?;
        let bucket = BucketPage::decode(&bucket_guard.read());
        bucket.lookup(key)
    }

    /// Returns `Ok(true)` on success, `Ok(false)` if the directory is
    /// already at max depth and the bucket still won't fit the key, and
    /// an error for a duplicate key (each bucket page rejects duplicates).
    pub fn insert(&self, key: Value, rid: Rid) -> Result<bool> {
        let hash = Self::hash(&key);

        let mut header_guard = self
            .bpm
            .fetch_page_write(self.header_page_id)
            .ok_or(DbError::ResourceExhausted("buffer pool exhausted".into()))?;
        let mut header = HeaderPage::decode(&header_guard.read());
        let dir_idx = header.hash_to_directory_index(hash);
        let mut directory_page_id = header.directory_page_id(dir_idx);
        if directory_page_id == INVALID_PAGE_ID {
            let dir_guard = self
                .bpm
                .new_page_guarded()
                .ok_or(DbError::ResourceExhausted("no frame for new directory page".into()))?;
            directory_page_id = dir_guard.page_id();
            let directory = DirectoryPage::new(self.directory_max_depth);
            let mut dir_guard = dir_guard;
            directory.encode(&mut dir_guard.write());
            header.set_directory_page_id(dir_idx, directory_page_id);
            header.encode(&mut header_guard.write());
        }
        drop(header_guard);

        let mut dir_guard = self
            .bpm
            .fetch_page_write(directory_page_id)
            .ok_or(DbError::ResourceExhausted("buffer pool exhausted".into()))?;
        let mut directory = DirectoryPage::decode(&dir_guard.read());

        let mut bucket_idx = directory.hash_to_bucket_index(hash);
        if directory.bucket_page_id(bucket_idx) == INVALID_PAGE_ID {
            let bucket_guard = self
                .bpm
                .new_page_guarded()
                .ok_or(DbError::ResourceExhausted("no frame for new bucket page".into()))?;
            let bucket_page_id = bucket_guard.page_id();
            let bucket = BucketPage::new(self.bucket_max_size);
            let mut bucket_guard = bucket_guard;
            bucket.encode(&mut bucket_guard.write());
            directory.set_bucket_page_id(bucket_idx, bucket_page_id);
        }

        loop {
            bucket_idx = directory.hash_to_bucket_index(hash);
            let bucket_page_id = directory.bucket_page_id(bucket_idx);
            let mut bucket_guard = self
                .bpm
                .fetch_page_write(bucket_page_id)
                .ok_or(DbError::ResourceExhausted("buffer pool exhausted".into()))?;
            let mut bucket = BucketPage::decode(&bucket_guard.read());

            if !bucket.is_full() {
                if !bucket.insert(key.clone(), rid) {
                    return Err(DbError::AlreadyExists(format!("duplicate key {key:?}")));
                }
                bucket.encode(&mut bucket_guard.write());
                directory.encode(&mut dir_guard.write());
                return Ok(true);
            }

            // Bucket is full: split it, growing the directory first if
            // this bucket is already as deep as the directory is wide.
            if directory.local_depth(bucket_idx) == directory.global_depth {
                if directory.global_depth == directory.max_depth {
                    directory.encode(&mut dir_guard.write());
                    return Ok(false);
                }
                directory.incr_global_depth();
                bucket_idx = directory.hash_to_bucket_index(hash);
                tracing::trace!(global_depth = directory.global_depth, "hash table directory doubled");
            }

            let old_local_depth = directory.local_depth(bucket_idx);
            let new_local_depth = old_local_depth + 1;

            let new_bucket_guard = self
                .bpm
                .new_page_guarded()
                .ok_or(DbError::ResourceExhausted("no frame for split bucket page".into()))?;
            let new_bucket_page_id = new_bucket_guard.page_id();
            let old_bucket_page_id = directory.bucket_page_id(bucket_idx);

            let mut old_bucket = BucketPage::new(self.bucket_max_size);
            let mut new_bucket = BucketPage::new(self.bucket_max_size);
            for (k, v) in bucket.entries.drain(..) {
                let bit = (Self::hash(&k) >> old_local_depth) & 1;
                if bit == 0 {
                    old_bucket.insert(k, v);
                } else {
                    new_bucket.insert(k, v);
                }
            }
            tracing::trace!(bucket_idx, old_local_depth, new_local_depth, "splitting full bucket");
            old_bucket.encode(&mut bucket_guard.write());
            let mut new_bucket_guard = new_bucket_guard;
            new_bucket.encode(&mut new_bucket_guard.write());
            drop(bucket_guard);
            drop(new_bucket_guard);

            // Every slot sharing the old local depth's low bits with
            // `bucket_idx` pointed at the bucket we just split, regardless
            // of what the bits above `old_local_depth` are; step through
            // all of them rather than matching on `new_local_depth`, which
            // would only ever select one side of the split.
            let mask_old = (1u32 << old_local_depth) - 1;
            let pattern = bucket_idx & mask_old;
            let step = 1u32 << old_local_depth;
            let mut i = pattern;
            while i < directory.size() {
                let bit = (i >> old_local_depth) & 1;
                directory.set_bucket_page_id(
                    i,
                    if bit == 0 {
                        old_bucket_page_id
                    } else {
                        new_bucket_page_id
                    },
                );
                directory.set_local_depth(i, new_local_depth);
                i += step;
            }
            // Loop retries the insert; the target bucket may still be full
            // if many keys collide past the new split bit.
        }
    }

    pub fn remove(&self, key: &Value) -> Result<bool> {
        let hash = Self::hash(key);

        let header_guard = self
            .bpm
            .fetch_page_read(self.header_page_id)
            .ok_or(DbError::ResourceExhausted("buffer pool exhausted".into()))?;
        let header = HeaderPage::decode(&header_guard.read());
        let dir_idx = header.hash_to_directory_index(hash);
        let directory_page_id = header.directory_page_id(dir_idx);
        drop(header_guard);
        if directory_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let mut dir_guard = self
            .bpm
            .fetch_page_write(directory_page_id)
            .ok_or(DbError::ResourceExhausted("buffer pool exhausted".into()))?;
        let mut directory = DirectoryPage::decode(&dir_guard.read());

        let bucket_idx = directory.hash_to_bucket_index(hash);
        let bucket_page_id = directory.bucket_page_id(bucket_idx);
        if bucket_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let removed = {
            let mut bucket_guard = self
                .bpm
                .fetch_page_write(bucket_page_id)
                .ok_or(DbError::ResourceExhausted("buffer pool exhausted".into()))?;
            let mut bucket = BucketPage::decode(&bucket_guard.read());
            let removed = bucket.remove(key);
            if removed {
                bucket.encode(&mut bucket_guard.write());
            }
            removed
        };
        if !removed {
            return Ok(false);
        }

        // Merge upward while the just-vacated bucket is empty and shares
        // its split image's local depth.
        let mut current_idx = bucket_idx;
        loop {
            let current_page_id = directory.bucket_page_id(current_idx);
            let local_depth = directory.local_depth(current_idx);
            if local_depth == 0 {
                break;
            }
            let is_empty = {
                let guard = self
                    .bpm
                    .fetch_page_read(current_page_id)
                    .ok_or(DbError::ResourceExhausted("buffer pool exhausted".into()))?;
                BucketPage::decode(&guard.read()).is_empty()
            };
            if !is_empty {
                break;
            }
            let split_idx = directory.split_image_index(current_idx);
            if directory.local_depth(split_idx) != local_depth {
                break;
            }
            let split_page_id = directory.bucket_page_id(split_idx);
            self.bpm.delete_page(current_page_id);
            for i in 0..directory.size() {
                if directory.bucket_page_id(i) == current_page_id
                    || directory.bucket_page_id(i) == split_page_id
                {
                    directory.set_bucket_page_id(i, split_page_id);
                    directory.decr_local_depth(i);
                }
            }
            tracing::trace!(current_idx, split_idx, "merging empty bucket into split image");
            current_idx = split_idx;
        }

        while directory.can_shrink() {
            directory.decr_global_depth();
            tracing::trace!(global_depth = directory.global_depth, "hash table directory halved");
        }

        directory.encode(&mut dir_guard.write());
        Ok(true)
    }
}
