//! The LRU-K replacement policy.
//!
//! Every tracked frame remembers the timestamps of its last (at most) `k`
//! accesses. The eviction victim is the evictable frame with the greatest
//! "backward k-distance" — the time since its k-th most recent access, or
//! `+∞` if it has been accessed fewer than `k` times. Among `+∞` frames the
//! one with the oldest single access wins, which approximates classic LRU
//! for frames the replacer hasn't seen enough of yet.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::common::FrameId;
use crate::error::{DbError, Result};

#[derive(Debug, Default)]
struct LruKNode {
    /// Oldest access first; bounded to the last `k` entries.
    history: Vec<u64>,
    is_evictable: bool,
}

impl LruKNode {
    /// `None` means infinite backward distance (fewer than `k` accesses).
    fn backward_distance(&self, k: usize, now: u64) -> Option<u64> {
        if self.history.len() < k {
            None
        } else {
            Some(now - self.history[self.history.len() - k])
        }
    }

    fn earliest_access(&self) -> u64 {
        self.history.first().copied().unwrap_or(0)
    }
}

struct Inner {
    node_store: HashMap<FrameId, LruKNode>,
    current_timestamp: u64,
    curr_size: usize,
    replacer_size: usize,
    k: usize,
}

pub struct LruKReplacer {
    inner: Mutex<Inner>,
}

impl LruKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k >= 2, "LRU-K replacer requires k >= 2");
        Self {
            inner: Mutex::new(Inner {
                node_store: HashMap::new(),
                current_timestamp: 0,
                curr_size: 0,
                replacer_size: num_frames,
                k,
            }),
        }
    }

    fn check_frame_id(inner: &Inner, frame_id: FrameId) -> Result<()> {
        if frame_id < 0 || frame_id as usize >= inner.replacer_size {
            return Err(DbError::Internal(format!(
                "frame id {frame_id} out of range [0, {})",
                inner.replacer_size
            )));
        }
        Ok(())
    }

    /// Records an access to `frame_id`, creating its history entry on
    /// first sight. New frames start non-evictable.
    pub fn record_access(&self, frame_id: FrameId) -> Result<()> {
        let mut inner = self.inner.lock();
        Self::check_frame_id(&inner, frame_id)?;
        inner.current_timestamp += 1;
        let ts = inner.current_timestamp;
        let k = inner.k;
        let node = inner.node_store.entry(frame_id).or_default();
        node.history.push(ts);
        if node.history.len() > k {
            node.history.remove(0);
        }
        Ok(())
    }

    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        Self::check_frame_id(&inner, frame_id)?;
        let Some(node) = inner.node_store.get_mut(&frame_id) else {
            return Ok(());
        };
        let was = node.is_evictable;
        node.is_evictable = evictable;
        if was && !evictable {
            inner.curr_size -= 1;
        } else if !was && evictable {
            inner.curr_size += 1;
        }
        Ok(())
    }

    /// Returns the evicted frame id, removing its history, or `None` if no
    /// evictable frame exists.
    pub fn evict(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        let k = inner.k;
        let now = inner.current_timestamp;

        let mut best: Option<(FrameId, Option<u64>, u64)> = None;
        for (&frame_id, node) in inner.node_store.iter() {
            if !node.is_evictable {
                continue;
            }
            let dist = node.backward_distance(k, now);
            let earliest = node.earliest_access();
            let is_better = match best {
                None => true,
                Some((_, best_dist, best_earliest)) => match (dist, best_dist) {
                    (None, Some(_)) => true,
                    (Some(_), None) => false,
                    (None, None) => earliest < best_earliest,
                    (Some(d), Some(bd)) => d > bd,
                },
            };
            if is_better {
                best = Some((frame_id, dist, earliest));
            }
        }

        let victim = best.map(|(frame_id, _, _)| frame_id)?;
        inner.node_store.remove(&victim);
        inner.curr_size -= 1;
        Some(victim)
    }

    /// Explicitly drops a frame's history. Only legal on evictable frames,
    /// or frames the replacer has never seen.
    pub fn remove(&self, frame_id: FrameId) -> Result<()> {
        let mut inner = self.inner.lock();
        Self::check_frame_id(&inner, frame_id)?;
        if let Some(node) = inner.node_store.get(&frame_id) {
            if !node.is_evictable {
                return Err(DbError::Internal(format!(
                    "cannot remove a non-evictable frame {frame_id}"
                )));
            }
            inner.node_store.remove(&frame_id);
            inner.curr_size -= 1;
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.inner.lock().curr_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_infinite_distance_frames() {
        let replacer = LruKReplacer::new(4, 2);
        for frame in [1, 2, 3] {
            replacer.record_access(frame).unwrap();
            replacer.set_evictable(frame, true).unwrap();
        }
        // Frame 1 has only one access (infinite distance); frames 2 and 3
        // likewise. Among infinite-distance frames, earliest wins: frame 1.
        assert_eq!(replacer.evict(), Some(1));
    }

    #[test]
    fn picks_greatest_backward_k_distance_once_all_have_k_accesses() {
        let replacer = LruKReplacer::new(4, 2);
        for frame in [1, 2, 3] {
            replacer.record_access(frame).unwrap();
        }
        // Give frame 1 and 3 a second, more recent access; frame 2 never
        // gets a second access so it keeps infinite distance and must win.
        replacer.record_access(1).unwrap();
        replacer.record_access(3).unwrap();
        for frame in [1, 2, 3] {
            replacer.set_evictable(frame, true).unwrap();
        }
        assert_eq!(replacer.evict(), Some(2));
    }

    #[test]
    fn out_of_range_frame_errors() {
        let replacer = LruKReplacer::new(2, 2);
        assert!(replacer.record_access(5).is_err());
    }
}
