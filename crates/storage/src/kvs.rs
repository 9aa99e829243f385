//! In-memory identifier store
//!
//! A bidirectional key ⇄ object-id map with a timestamp per row. It is the
//! default `Kvs` collaborator for callers that do not bring their own store.
//!
//! Both directions live behind one `parking_lot::RwLock` so that a `set` can
//! retire stale reverse mappings atomically. parking_lot locks do not
//! poison, so a panicking caller cannot wedge the store.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use vqcache_core::{Kvs, KvsRecord, ObjectId, Result, Timestamp};

#[derive(Debug, Default)]
struct Maps {
    forward: FxHashMap<String, KvsRecord>,
    inverse: FxHashMap<ObjectId, String>,
}

/// Bidirectional key ⇄ object-id map
#[derive(Debug, Default)]
pub struct MemoryKvs {
    maps: RwLock<Maps>,
}

impl MemoryKvs {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            maps: RwLock::new(Maps {
                forward: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
                inverse: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            }),
        }
    }

    /// Look up the key that owns `object_id`
    pub fn get_inverse(&self, object_id: ObjectId) -> Option<(String, Timestamp)> {
        let maps = self.maps.read();
        let key = maps.inverse.get(&object_id)?;
        let record = maps.forward.get(key)?;
        Some((key.clone(), record.timestamp))
    }

    /// Remove the row for `key`, returning its object id
    pub fn delete(&self, key: &str) -> Option<ObjectId> {
        let mut maps = self.maps.write();
        let record = maps.forward.remove(key)?;
        maps.inverse.remove(&record.object_id);
        Some(record.object_id)
    }

    /// Remove the row owning `object_id`, returning its key
    pub fn delete_inverse(&self, object_id: ObjectId) -> Option<String> {
        let mut maps = self.maps.write();
        let key = maps.inverse.remove(&object_id)?;
        maps.forward.remove(&key);
        Some(key)
    }

    /// Insert or replace a row, keeping both directions one-to-one
    fn insert(&self, key: &str, object_id: ObjectId, timestamp: Timestamp) {
        let mut maps = self.maps.write();
        let record = KvsRecord::new(object_id, timestamp);
        if let Some(old) = maps.forward.insert(key.to_owned(), record) {
            if old.object_id != object_id {
                maps.inverse.remove(&old.object_id);
            }
        }
        if let Some(previous_owner) = maps.inverse.insert(object_id, key.to_owned()) {
            if previous_owner != key {
                maps.forward.remove(&previous_owner);
            }
        }
    }
}

impl Kvs for MemoryKvs {
    fn get(&self, key: &str) -> Option<KvsRecord> {
        self.maps.read().forward.get(key).copied()
    }

    fn set(&self, key: &str, object_id: ObjectId, timestamp: Timestamp) -> Result<()> {
        self.insert(key, object_id, timestamp);
        Ok(())
    }

    fn range(&self, f: &mut dyn FnMut(&str, ObjectId, Timestamp) -> bool) {
        // Copy out first so `f` may call back into the store.
        let rows: Vec<(String, KvsRecord)> = self
            .maps
            .read()
            .forward
            .iter()
            .map(|(k, r)| (k.clone(), *r))
            .collect();
        for (key, record) in rows {
            if !f(&key, record.object_id, record.timestamp) {
                return;
            }
        }
    }

    fn len(&self) -> usize {
        self.maps.read().forward.len()
    }
}
