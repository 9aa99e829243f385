//! Merge-read layer
//!
//! `DataManager` reconciles three sources of truth into one view per object:
//! the uncommitted insert buffer, the uncommitted delete buffer and the
//! committed identifier store.
//!
//! # Precedence
//!
//! 1. An authoritative buffered insert wins
//! 2. A buffered tombstone newer than the buffered insert hides the object,
//!    even if the store still has a row (soft delete)
//! 3. Otherwise the committed row answers
//!
//! Reads refresh a committed row whose timestamp is older than the buffered
//! insert. That refresh is best effort: a rejected write is logged and the
//! read still succeeds.
//!
//! # Consistency
//!
//! `update_timestamp` uses pop-check-restore rollbacks: a pop is compared
//! with the value observed before deciding, and a mismatch is re-pushed.
//! This is optimistic, not linearizable; a reader between the pop and the
//! restore can observe a transient absence.

use std::collections::HashSet;

use rustc_hash::FxHashSet;
use tracing::{debug, warn};
use vqcache_core::{
    newer, CancelToken, Error, Kvs, KvsRecord, ObjectId, Result, Timestamp, Vector, VectorSource,
};
use vqcache_storage::VQueue;

use crate::config::CacheConfig;
use crate::update::{ObservedState, UpdatePlan};

/// Merge-read and timestamp-update operations over a queue and a store
#[derive(Debug)]
pub struct DataManager<K: Kvs> {
    vqueue: VQueue,
    kvs: K,
}

impl<K: Kvs> DataManager<K> {
    /// Create a manager with an empty queue
    pub fn new(kvs: K) -> Self {
        Self::with_queue(VQueue::new(), kvs)
    }

    /// Create a manager whose queue is sized by `config`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn with_config(config: &CacheConfig, kvs: K) -> Result<Self> {
        Ok(Self::with_queue(config.build_queue()?, kvs))
    }

    /// Create a manager over an existing queue
    pub fn with_queue(vqueue: VQueue, kvs: K) -> Self {
        Self { vqueue, kvs }
    }

    /// The write buffers
    pub fn vqueue(&self) -> &VQueue {
        &self.vqueue
    }

    /// The committed identifier store
    pub fn kvs(&self) -> &K {
        &self.kvs
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Object id of `key` if it is currently visible
    ///
    /// Returns `Some(0)` for an object that is only buffered and has no
    /// committed id yet.
    pub fn exists(&self, key: &str) -> Option<ObjectId> {
        if key.is_empty() {
            return None;
        }
        let lookup = self.vqueue.get_vector_with_timestamp(key);
        if lookup.is_absent() {
            return self.kvs.get(key).map(|r| r.object_id);
        }

        let record = self.kvs.get(key);
        if lookup.exists {
            return Some(match record {
                Some(record) => {
                    self.refresh_committed(key, record, lookup.insert_ts);
                    record.object_id
                }
                None => 0,
            });
        }

        let record = record?;
        self.refresh_committed(key, record, lookup.insert_ts);
        if lookup.is_tombstoned() {
            debug!(
                target: "vqcache::memstore",
                key,
                delete_ts = lookup.delete_ts,
                "Exists: committed object has a pending delete"
            );
            return None;
        }
        Some(record.object_id)
    }

    /// Vector and timestamp of `key`
    ///
    /// Buffered vectors are served directly; committed ones are fetched from
    /// `source` by object id.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if neither source has a visible object or the
    /// fetch fails, `EmptyKey` for an empty key.
    pub fn get_object(&self, key: &str, source: &dyn VectorSource) -> Result<(Vector, Timestamp)> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        let lookup = self.vqueue.get_vector_with_timestamp(key);
        if let (true, Some(vector)) = (lookup.exists, lookup.vector.as_ref()) {
            return Ok((vector.clone(), lookup.insert_ts));
        }

        let Some(record) = self.kvs.get(key) else {
            debug!(target: "vqcache::memstore", key, "GetObject: not buffered and not committed");
            return Err(Error::ObjectNotFound(key.to_owned()));
        };
        let timestamp = self.refresh_committed(key, record, lookup.insert_ts);
        if lookup.is_tombstoned() {
            debug!(
                target: "vqcache::memstore",
                key,
                delete_ts = lookup.delete_ts,
                "GetObject: committed object has a pending delete"
            );
            return Err(Error::ObjectNotFound(key.to_owned()));
        }

        match source.fetch_vector(record.object_id) {
            Ok(vector) => Ok((vector, timestamp)),
            Err(err) => {
                debug!(
                    target: "vqcache::memstore",
                    key,
                    object_id = record.object_id,
                    error = %err,
                    "GetObject: vector fetch failed"
                );
                Err(Error::ObjectNotFound(key.to_owned()))
            }
        }
    }

    /// Visit every visible object once
    ///
    /// Buffered inserts come first, reported with the committed object id
    /// when one exists and `0` otherwise. A buffered insert that is not newer
    /// than its committed row is reported from the store instead. Committed
    /// rows with a pending delete are skipped. Stops when `f` returns false
    /// or `cancel` fires.
    pub fn list_object_func<F>(&self, cancel: &CancelToken, mut f: F)
    where
        F: FnMut(&str, ObjectId, Timestamp) -> bool,
    {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut stopped = false;

        self.vqueue.range(cancel, |key, _, its| {
            let object_id = match self.kvs.get(key) {
                Some(record) if !newer(its, record.timestamp) => return true,
                Some(record) => record.object_id,
                None => 0,
            };
            seen.insert(key.to_owned());
            if !f(key, object_id, its) {
                stopped = true;
                return false;
            }
            true
        });
        if stopped || cancel.is_cancelled() {
            return;
        }

        self.kvs.range(&mut |key, object_id, kts| {
            if cancel.is_cancelled() {
                return false;
            }
            if seen.contains(key) || self.vqueue.dv_exists(key).is_some() {
                return true;
            }
            f(key, object_id, kts)
        });
    }

    /// Every visible key
    pub fn uuids(&self) -> HashSet<String> {
        let mut keys = HashSet::with_capacity(self.kvs.len() + self.vqueue.ivq_len());
        self.list_object_func(&CancelToken::new(), |key, _, _| {
            keys.insert(key.to_owned());
            true
        });
        keys
    }

    // ========================================================================
    // Timestamp update
    // ========================================================================

    /// Move the timestamp of `key` to `ts`
    ///
    /// `source` is only consulted to re-fetch the vector of a shadowed insert
    /// whose vector was lost. Merge reads never report a vector for a
    /// shadowed insert, so that case does not arise from the current queue
    /// state and `source` may be `None`.
    ///
    /// # Errors
    ///
    /// See [`UpdatePlan::decide`]; a store rejecting the refresh is returned
    /// as `Kvs`.
    pub fn update_timestamp(
        &self,
        key: &str,
        ts: Timestamp,
        force: bool,
        source: Option<&dyn VectorSource>,
    ) -> Result<()> {
        let state = ObservedState::observe(&self.vqueue, &self.kvs, key);
        let plan = UpdatePlan::decide(key, &state, ts, force)?;
        debug!(target: "vqcache::memstore", key, ts, force, case = plan.case(), "UpdateTimestamp");
        self.execute(key, ts, plan, &state, source)
    }

    /// Apply `plan`, rolling back pops that do not match `state`
    fn execute(
        &self,
        key: &str,
        ts: Timestamp,
        plan: UpdatePlan,
        state: &ObservedState,
        source: Option<&dyn VectorSource>,
    ) -> Result<()> {
        match plan {
            UpdatePlan::ReviveBuffered { vector } => {
                self.vqueue.push_insert(key, vector, ts);
                self.pop_delete_expecting(key, state.delete_ts);
            }
            UpdatePlan::RefreshBufferedAndCommitted {
                vector,
                object_id,
                fence_tombstone,
            } => {
                self.vqueue.push_insert(key, vector, ts);
                self.kvs.set(key, object_id, ts)?;
                if fence_tombstone {
                    // No fence below the first valid timestamp
                    self.vqueue.push_delete_at(key, ts - 1);
                }
            }
            UpdatePlan::RefreshCommitted {
                object_id,
                pop_tombstone,
            } => {
                self.kvs.set(key, object_id, ts)?;
                if pop_tombstone {
                    self.pop_delete_expecting(key, state.delete_ts);
                }
            }
            UpdatePlan::RestoreCommitted { object_id, refetch } => {
                self.kvs.set(key, object_id, ts)?;
                let refetched = match source {
                    Some(source) if refetch => self.fetch_for_restore(source, key, object_id),
                    _ => None,
                };
                match refetched {
                    Some(vector) => {
                        self.vqueue.push_insert(key, vector, ts);
                    }
                    None => self.pop_insert_expecting(key, state.insert_ts),
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Refresh a committed row that is older than the buffered insert.
    /// Returns the committed timestamp after the refresh.
    fn refresh_committed(&self, key: &str, record: KvsRecord, its: Timestamp) -> Timestamp {
        if its <= 0 || !newer(its, record.timestamp) {
            return record.timestamp;
        }
        match self.kvs.set(key, record.object_id, its) {
            Ok(()) => its,
            Err(err) => {
                warn!(
                    target: "vqcache::memstore",
                    key,
                    object_id = record.object_id,
                    error = %err,
                    "Failed to refresh stale committed timestamp"
                );
                record.timestamp
            }
        }
    }

    fn fetch_for_restore(
        &self,
        source: &dyn VectorSource,
        key: &str,
        object_id: ObjectId,
    ) -> Option<Vector> {
        match source.fetch_vector(object_id) {
            Ok(vector) => Some(vector),
            Err(err) => {
                debug!(
                    target: "vqcache::memstore",
                    key,
                    object_id,
                    error = %err,
                    "UpdateTimestamp: re-fetch failed, dropping shadowed insert"
                );
                None
            }
        }
    }

    /// Pop the tombstone of `key`; re-push whatever was popped if it is not
    /// the one observed before deciding.
    fn pop_delete_expecting(&self, key: &str, expected: Timestamp) {
        if let Some(popped) = self.vqueue.pop_delete(key) {
            if popped != expected {
                debug!(
                    target: "vqcache::memstore",
                    key,
                    expected,
                    popped,
                    "Concurrent delete detected, rolling back"
                );
                self.vqueue.push_delete(key, popped);
            }
        }
    }

    /// Pop the insert of `key`; re-push whatever was popped if it is not the
    /// one observed before deciding.
    fn pop_insert_expecting(&self, key: &str, expected: Timestamp) {
        if let Some((vector, popped)) = self.vqueue.pop_insert(key) {
            if popped != expected {
                debug!(
                    target: "vqcache::memstore",
                    key,
                    expected,
                    popped,
                    "Concurrent insert detected, rolling back"
                );
                self.vqueue.push_insert(key, vector, popped);
            }
        }
    }
}
