//! The three page roles of the on-disk extendible hash index: header,
//! directory, and bucket. Each page type is logically a small struct
//! (depths plus an array of ids, or an array of key/value entries); it is
//! (de)serialized to/from the fixed `PAGE_SIZE` byte buffer a page guard
//! hands back, the way the rest of the engine treats pages as opaque
//! byte blocks interpreted by whoever holds the latch.

use crate::common::{PageId, Value, INVALID_PAGE_ID, PAGE_SIZE};
use crate::common::rid::Rid;

/// High bits of a 32-bit key hash select a directory; this caps how many
/// directories a single header page can address (`2^max_depth`).
pub const HEADER_MAX_DEPTH_LIMIT: u32 = 9;
pub const DIRECTORY_MAX_DEPTH_LIMIT: u32 = 9;

#[derive(Debug, Clone)]
pub struct HeaderPage {
    pub max_depth: u32,
    pub directory_page_ids: Vec<PageId>,
}

impl HeaderPage {
    pub fn new(max_depth: u32) -> Self {
        assert!(max_depth <= HEADER_MAX_DEPTH_LIMIT);
        Self {
            max_depth,
            directory_page_ids: vec![INVALID_PAGE_ID; 1usize << max_depth],
        }
    }

    /// The high `max_depth` bits of the hash select a directory slot.
    pub fn hash_to_directory_index(&self, hash: u32) -> u32 {
        if self.max_depth == 0 {
            return 0;
        }
        hash >> (32 - self.max_depth)
    }

    pub fn directory_page_id(&self, idx: u32) -> PageId {
        self.directory_page_ids[idx as usize]
    }

    pub fn set_directory_page_id(&mut self, idx: u32, page_id: PageId) {
        self.directory_page_ids[idx as usize] = page_id;
    }

    pub fn max_size(&self) -> u32 {
        1 << self.max_depth
    }

    pub fn encode(&self, buf: &mut [u8; PAGE_SIZE]) {
        let mut w = Writer::new(buf);
        w.put_u32(self.max_depth);
        w.put_u32(self.directory_page_ids.len() as u32);
        for &id in &self.directory_page_ids {
            w.put_i64(id);
        }
    }

    pub fn decode(buf: &[u8; PAGE_SIZE]) -> Self {
        let mut r = Reader::new(buf);
        let max_depth = r.get_u32();
        let len = r.get_u32() as usize;
        let directory_page_ids = (0..len).map(|_| r.get_i64()).collect();
        Self {
            max_depth,
            directory_page_ids,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryPage {
    pub max_depth: u32,
    pub global_depth: u32,
    pub local_depths: Vec<u8>,
    pub bucket_page_ids: Vec<PageId>,
}

impl DirectoryPage {
    pub fn new(max_depth: u32) -> Self {
        assert!(max_depth <= DIRECTORY_MAX_DEPTH_LIMIT);
        let capacity = 1usize << max_depth;
        Self {
            max_depth,
            global_depth: 0,
            local_depths: vec![0; capacity],
            bucket_page_ids: vec![INVALID_PAGE_ID; capacity],
        }
    }

    pub fn size(&self) -> u32 {
        1 << self.global_depth
    }

    pub fn max_size(&self) -> u32 {
        1 << self.max_depth
    }

    pub fn global_depth_mask(&self) -> u32 {
        self.size() - 1
    }

    pub fn local_depth_mask(&self, idx: u32) -> u32 {
        (1u32 << self.local_depths[idx as usize]) - 1
    }

    /// The low `global_depth` bits of the hash select a bucket slot.
    pub fn hash_to_bucket_index(&self, hash: u32) -> u32 {
        hash & self.global_depth_mask()
    }

    pub fn bucket_page_id(&self, idx: u32) -> PageId {
        self.bucket_page_ids[idx as usize]
    }

    pub fn set_bucket_page_id(&mut self, idx: u32, page_id: PageId) {
        self.bucket_page_ids[idx as usize] = page_id;
    }

    pub fn local_depth(&self, idx: u32) -> u32 {
        self.local_depths[idx as usize] as u32
    }

    pub fn set_local_depth(&mut self, idx: u32, depth: u32) {
        self.local_depths[idx as usize] = depth as u8;
    }

    pub fn incr_local_depth(&mut self, idx: u32) {
        self.local_depths[idx as usize] += 1;
    }

    pub fn decr_local_depth(&mut self, idx: u32) {
        self.local_depths[idx as usize] -= 1;
    }

    /// The slot that shares every bit of `idx` except the newest one this
    /// bucket's local depth introduced — its "split image".
    pub fn split_image_index(&self, idx: u32) -> u32 {
        let local_depth = self.local_depth(idx);
        if local_depth == 0 {
            return idx;
        }
        idx ^ (1 << (local_depth - 1))
    }

    pub fn incr_global_depth(&mut self) {
        assert!(self.global_depth < self.max_depth);
        let offset = 1u32 << self.global_depth;
        for i in offset..2 * offset {
            self.local_depths[i as usize] = self.local_depths[(i - offset) as usize];
            self.bucket_page_ids[i as usize] = self.bucket_page_ids[(i - offset) as usize];
        }
        self.global_depth += 1;
    }

    pub fn decr_global_depth(&mut self) {
        assert!(self.global_depth > 0);
        self.global_depth -= 1;
    }

    /// Whether the directory's upper half is now a byte-for-byte duplicate
    /// of its lower half and can be halved away.
    pub fn can_shrink(&self) -> bool {
        if self.global_depth == 0 {
            return false;
        }
        let offset = 1u32 << (self.global_depth - 1);
        (0..offset).all(|i| {
            self.bucket_page_ids[i as usize] == self.bucket_page_ids[(i + offset) as usize]
        })
    }

    pub fn encode(&self, buf: &mut [u8; PAGE_SIZE]) {
        let mut w = Writer::new(buf);
        w.put_u32(self.max_depth);
        w.put_u32(self.global_depth);
        w.put_u32(self.local_depths.len() as u32);
        for &d in &self.local_depths {
            w.put_u8(d);
        }
        for &id in &self.bucket_page_ids {
            w.put_i64(id);
        }
    }

    pub fn decode(buf: &[u8; PAGE_SIZE]) -> Self {
        let mut r = Reader::new(buf);
        let max_depth = r.get_u32();
        let global_depth = r.get_u32();
        let len = r.get_u32() as usize;
        let local_depths = (0..len).map(|_| r.get_u8()).collect();
        let bucket_page_ids = (0..len).map(|_| r.get_i64()).collect();
        Self {
            max_depth,
            global_depth,
            local_depths,
            bucket_page_ids,
        }
    }
}

/// A bucket's entries: logical key/value pairs, where the key is an engine
/// `Value` (so this index can back an equality predicate on any column
/// type) and the value is the tuple's `Rid`.
#[derive(Debug, Clone)]
pub struct BucketPage {
    pub max_size: u32,
    pub entries: Vec<(Value, Rid)>,
}

impl BucketPage {
    pub fn new(max_size: u32) -> Self {
        Self {
            max_size,
            entries: Vec::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_full(&self) -> bool {
        self.size() >= self.max_size
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, key: &Value) -> Option<Rid> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// Returns `false` if the key is already present (duplicates within a
    /// single bucket page are rejected; callers deciding on uniqueness
    /// constraints live above this layer).
    pub fn insert(&mut self, key: Value, value: Rid) -> bool {
        if self.entries.iter().any(|(k, _)| k == &key) {
            return false;
        }
        self.entries.push((key, value));
        true
    }

    pub fn remove(&mut self, key: &Value) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        self.entries.len() != before
    }

    pub fn encode(&self, buf: &mut [u8; PAGE_SIZE]) {
        let mut w = Writer::new(buf);
        w.put_u32(self.max_size);
        w.put_u32(self.entries.len() as u32);
        for (key, rid) in &self.entries {
            w.put_value(key);
            w.put_i64(rid.page_id());
            w.put_u32(rid.slot_num());
        }
    }

    pub fn decode(buf: &[u8; PAGE_SIZE]) -> Self {
        let mut r = Reader::new(buf);
        let max_size = r.get_u32();
        let count = r.get_u32() as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let key = r.get_value();
            let page_id = r.get_i64();
            let slot_num = r.get_u32();
            entries.push((key, Rid::new(page_id, slot_num)));
        }
        Self { max_size, entries }
    }
}

/// Hashes an engine `Value` into the 32-bit space the hash table indexes
/// on. FNV-1a over the value's encoded bytes; deterministic across runs
/// because the index is only ever read by the process that wrote it.
pub fn hash_value(value: &Value) -> u32 {
    let mut buf = [0u8; PAGE_SIZE];
    let mut w = Writer::new(&mut buf);
    w.put_value(value);
    let len = w.offset;
    let mut hash: u32 = 0x811c9dc5;
    for &b in &buf[..len] {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}

struct Writer<'a> {
    buf: &'a mut [u8; PAGE_SIZE],
    offset: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8; PAGE_SIZE]) -> Self {
        Self { buf, offset: 0 }
    }

    fn put_u8(&mut self, v: u8) {
        self.buf[self.offset] = v;
        self.offset += 1;
    }

    fn put_u32(&mut self, v: u32) {
        self.buf[self.offset..self.offset + 4].copy_from_slice(&v.to_le_bytes());
        self.offset += 4;
    }

    fn put_i64(&mut self, v: i64) {
        self.buf[self.offset..self.offset + 8].copy_from_slice(&v.to_le_bytes());
        self.offset += 8;
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.buf[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
    }

    fn put_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.put_u8(0),
            Value::Boolean(b) => {
                self.put_u8(1);
                self.put_u8(*b as u8);
            }
            Value::Integer(i) => {
                self.put_u8(2);
                self.buf[self.offset..self.offset + 8].copy_from_slice(&i.to_le_bytes());
                self.offset += 8;
            }
            Value::Varchar(s) => {
                self.put_u8(3);
                self.put_bytes(s.as_bytes());
            }
        }
    }
}

struct Reader<'a> {
    buf: &'a [u8; PAGE_SIZE],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8; PAGE_SIZE]) -> Self {
        Self { buf, offset: 0 }
    }

    fn get_u8(&mut self) -> u8 {
        let v = self.buf[self.offset];
        self.offset += 1;
        v
    }

    fn get_u32(&mut self) -> u32 {
        let v = u32::from_le_bytes(self.buf[self.offset..self.offset + 4].try_into().unwrap());
        self.offset += 4;
        v
    }

    fn get_i64(&mut self) -> i64 {
        let v = i64::from_le_bytes(self.buf[self.offset..self.offset + 8].try_into().unwrap());
        self.offset += 8;
        v
    }

    fn get_value(&mut self) -> Value {
        match self.get_u8() {
            0 => Value::Null,
            1 => Value::Boolean(self.get_u8() != 0),
            2 => {
                let v = i64::from_le_bytes(self.buf[self.offset..self.offset + 8].try_into().unwrap());
                self.offset += 8;
                Value::Integer(v)
            }
            3 => {
                let len = self.get_u32() as usize;
                let s = String::from_utf8_lossy(&self.buf[self.offset..self.offset + len]).into_owned();
                self.offset += len;
                Value::Varchar(s)
            }
            tag => unreachable!("unknown encoded value tag {tag}"),
        }
    }
}
