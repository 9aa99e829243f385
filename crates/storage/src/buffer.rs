//! Sharded timestamped buffer
//!
//! One half of the vqueue: a concurrent key → entry store holding at most one
//! entry per key, plus a live-count.
//!
//! # Design
//!
//! - DashMap: sharded, per-shard locking; different keys only contend when
//!   they hash to the same shard, and never across buffers
//! - FxHash: fast non-crypto hash for string keys
//! - Push is a compare-and-overwrite keyed by timestamp ordering, done under
//!   the entry lock of the target shard
//! - The live-count is incremented while the shard lock is still held on
//!   creation and decremented after an actual removal, so it never goes
//!   below the true number of entries that a remover has observed
//!
//! # Thread Safety
//!
//! Scans (`snapshot`) copy matching entries out before returning, so
//! callers may push or pop the same buffer while processing the result
//! without deadlocking on a shard lock.

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicUsize, Ordering};
use vqcache_core::{newer, Entry, Timestamp, Vector};

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Stored value for one key
#[derive(Debug, Clone)]
struct Slot {
    vector: Option<Vector>,
    timestamp: Timestamp,
}

/// Outcome of a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// No entry existed; a new one was created
    Created,
    /// An older entry was overwritten
    Replaced,
    /// The stored entry was at least as new; nothing changed
    Ignored,
}

impl PushOutcome {
    /// Whether the push changed the buffer
    #[inline]
    pub fn is_applied(self) -> bool {
        !matches!(self, PushOutcome::Ignored)
    }
}

/// Concurrent key → entry store with a live-count
pub struct Buffer {
    entries: DashMap<String, Slot, FxBuildHasher>,
    len: AtomicUsize,
}

impl Buffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher::default()),
            len: AtomicUsize::new(0),
        }
    }

    /// Create a buffer with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
            len: AtomicUsize::new(0),
        }
    }

    /// Create a buffer with pre-allocated capacity and an explicit shard count
    ///
    /// `shard_amount` must be a power of two greater than one; callers
    /// validate it (see `CacheConfig::validate`).
    pub fn with_capacity_and_shards(capacity: usize, shard_amount: usize) -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                FxBuildHasher::default(),
                shard_amount,
            ),
            len: AtomicUsize::new(0),
        }
    }

    /// Insert or overwrite the entry for `key`
    ///
    /// An existing entry is only overwritten if `timestamp` is strictly
    /// newer; ties keep the stored entry. The live-count is incremented
    /// exactly once, when the key is first created.
    pub fn push(&self, key: &str, vector: Option<Vector>, timestamp: Timestamp) -> PushOutcome {
        let slot = Slot { vector, timestamp };
        match self.entries.entry(key.to_owned()) {
            MapEntry::Occupied(mut occupied) => {
                if newer(timestamp, occupied.get().timestamp) {
                    occupied.insert(slot);
                    PushOutcome::Replaced
                } else {
                    PushOutcome::Ignored
                }
            }
            MapEntry::Vacant(vacant) => {
                // Count while the shard lock is held by the returned guard.
                let _guard = vacant.insert(slot);
                self.len.fetch_add(1, Ordering::AcqRel);
                PushOutcome::Created
            }
        }
    }

    /// Remove and return the entry for `key` if its timestamp is set
    pub fn pop(&self, key: &str) -> Option<Entry> {
        self.remove_if(key, |ts| ts != 0)
    }

    /// Remove and return the entry for `key` if `pred` accepts its timestamp
    ///
    /// The check and the removal happen under the same shard lock, so this is
    /// the fence used by flushes: an entry replaced by a concurrent push is
    /// left alone.
    pub fn remove_if(&self, key: &str, pred: impl FnOnce(Timestamp) -> bool) -> Option<Entry> {
        let (key, slot) = self.entries.remove_if(key, |_, slot| pred(slot.timestamp))?;
        self.len.fetch_sub(1, Ordering::AcqRel);
        Some(Entry {
            key,
            vector: slot.vector,
            timestamp: slot.timestamp,
        })
    }

    /// Load the vector and timestamp stored for `key`
    pub fn load(&self, key: &str) -> Option<(Option<Vector>, Timestamp)> {
        self.entries
            .get(key)
            .map(|slot| (slot.vector.clone(), slot.timestamp))
    }

    /// Load only the timestamp stored for `key`
    #[inline]
    pub fn timestamp(&self, key: &str) -> Option<Timestamp> {
        self.entries.get(key).map(|slot| slot.timestamp)
    }

    /// Whether `key` is present
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Copy out every entry accepted by `filter`
    ///
    /// Order is unspecified. Shard locks are released before returning.
    pub fn snapshot(&self, mut filter: impl FnMut(Timestamp) -> bool) -> Vec<Entry> {
        let mut out = Vec::with_capacity(self.len());
        for item in self.entries.iter() {
            let slot = item.value();
            if filter(slot.timestamp) {
                out.push(Entry {
                    key: item.key().clone(),
                    vector: slot.vector.clone(),
                    timestamp: slot.timestamp,
                });
            }
        }
        out
    }

    /// Live-count
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether the buffer holds no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer").field("len", &self.len()).finish()
    }
}
