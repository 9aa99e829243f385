//! Vector queue: paired insert and delete buffers
//!
//! `VQueue` absorbs insert and delete requests before they are committed to
//! the ANN index. Reads merge both buffers so callers see their own writes
//! with last-write-wins semantics:
//!
//! - An insert is authoritative only if it is strictly newer than any
//!   buffered tombstone for the same key
//! - A push never fails; invalid input (empty key, empty vector) is a no-op
//! - A push with timestamp `0` is stamped with the current time
//!
//! The delete buffer is not consulted when a tombstone is pushed; shadowed
//! inserts are resolved at read time and at flush time.

use crate::buffer::Buffer;
use vqcache_core::{newer, now_nanos, CancelToken, Lookup, Timestamp, Vector};

/// Point-in-time view of the buffer sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of buffered inserts
    pub insert_len: usize,
    /// Number of buffered tombstones
    pub delete_len: usize,
}

/// Paired insert/delete write cache
#[derive(Debug, Default)]
pub struct VQueue {
    pub(crate) inserts: Buffer,
    pub(crate) deletes: Buffer,
}

impl VQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue from explicitly built buffers
    pub fn with_buffers(inserts: Buffer, deletes: Buffer) -> Self {
        Self { inserts, deletes }
    }

    // ========================================================================
    // Push / Pop
    // ========================================================================

    /// Buffer an insert of `vector` under `key`
    ///
    /// Discarded if a tombstone at least as new as `timestamp` is buffered, or
    /// if a stored insert is at least as new. Returns whether the insert
    /// buffer changed.
    pub fn push_insert(&self, key: &str, vector: Vector, timestamp: Timestamp) -> bool {
        if key.is_empty() || vector.is_empty() {
            return false;
        }
        let timestamp = stamp(timestamp);
        if let Some(dts) = self.deletes.timestamp(key) {
            if !newer(timestamp, dts) {
                return false;
            }
        }
        self.inserts.push(key, Some(vector), timestamp).is_applied()
    }

    /// Buffer a tombstone for `key`
    ///
    /// Only overwrites a stored tombstone if `timestamp` is strictly newer.
    /// Returns whether the delete buffer changed.
    pub fn push_delete(&self, key: &str, timestamp: Timestamp) -> bool {
        if key.is_empty() {
            return false;
        }
        self.deletes.push(key, None, stamp(timestamp)).is_applied()
    }

    /// Buffer a tombstone for `key` at exactly `timestamp`
    ///
    /// Unlike [`push_delete`](Self::push_delete), a zero timestamp is not
    /// replaced with the current time: `timestamp <= 0` is a no-op. Used for
    /// tombstones derived from another timestamp.
    pub fn push_delete_at(&self, key: &str, timestamp: Timestamp) -> bool {
        if key.is_empty() || timestamp <= 0 {
            return false;
        }
        self.deletes.push(key, None, timestamp).is_applied()
    }

    /// Remove the buffered insert for `key`
    pub fn pop_insert(&self, key: &str) -> Option<(Vector, Timestamp)> {
        let entry = self.inserts.pop(key)?;
        entry.vector.map(|vector| (vector, entry.timestamp))
    }

    /// Remove the buffered tombstone for `key`
    pub fn pop_delete(&self, key: &str) -> Option<Timestamp> {
        self.deletes.pop(key).map(|entry| entry.timestamp)
    }

    // ========================================================================
    // Merge reads
    // ========================================================================

    /// Vector and insert timestamp of `key` if the insert is authoritative
    pub fn get_vector(&self, key: &str) -> Option<(Vector, Timestamp)> {
        let lookup = self.get_vector_with_timestamp(key);
        match lookup.vector {
            Some(vector) if lookup.exists => Some((vector, lookup.insert_ts)),
            _ => None,
        }
    }

    /// Merge both buffers for `key`
    ///
    /// Both timestamps are always reported when present, even if the insert
    /// is shadowed; the vector only when it is authoritative.
    pub fn get_vector_with_timestamp(&self, key: &str) -> Lookup {
        let delete_ts = self.deletes.timestamp(key).unwrap_or(0);
        let Some((vector, insert_ts)) = self.inserts.load(key) else {
            return Lookup {
                delete_ts,
                ..Lookup::default()
            };
        };
        let exists = vector.is_some() && (delete_ts == 0 || newer(insert_ts, delete_ts));
        Lookup {
            vector: if exists { vector } else { None },
            insert_ts,
            delete_ts,
            exists,
        }
    }

    /// Insert timestamp of `key` if the buffered insert is authoritative
    pub fn iv_exists(&self, key: &str) -> Option<Timestamp> {
        let lookup = self.get_vector_with_timestamp(key);
        (lookup.exists && lookup.insert_ts != 0).then_some(lookup.insert_ts)
    }

    /// Tombstone timestamp of `key` if the key is currently deleted
    pub fn dv_exists(&self, key: &str) -> Option<Timestamp> {
        let lookup = self.get_vector_with_timestamp(key);
        lookup.is_tombstoned().then_some(lookup.delete_ts)
    }

    /// Visit every buffered insert not shadowed by a newer-or-equal tombstone
    ///
    /// Entries are copied out before `f` runs, so `f` may push or pop.
    /// Stops when `f` returns false or `cancel` fires.
    pub fn range<F>(&self, cancel: &CancelToken, mut f: F)
    where
        F: FnMut(&str, &Vector, Timestamp) -> bool,
    {
        for entry in self.inserts.snapshot(|_| true) {
            if cancel.is_cancelled() {
                return;
            }
            let Some(vector) = entry.vector.as_ref() else {
                continue;
            };
            let shadowed = self
                .deletes
                .timestamp(&entry.key)
                .is_some_and(|dts| !newer(entry.timestamp, dts));
            if shadowed {
                continue;
            }
            if !f(&entry.key, vector, entry.timestamp) {
                return;
            }
        }
    }

    // ========================================================================
    // Sizes
    // ========================================================================

    /// Number of buffered inserts
    #[inline]
    pub fn ivq_len(&self) -> usize {
        self.inserts.len()
    }

    /// Number of buffered tombstones
    #[inline]
    pub fn dvq_len(&self) -> usize {
        self.deletes.len()
    }

    /// Snapshot of both live-counts
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            insert_len: self.ivq_len(),
            delete_len: self.dvq_len(),
        }
    }
}

#[inline]
fn stamp(timestamp: Timestamp) -> Timestamp {
    if timestamp == 0 {
        now_nanos()
    } else {
        timestamp
    }
}
