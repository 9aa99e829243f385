//! Timestamp update decision table
//!
//! `UpdateTimestamp` composes the insert buffer, the delete buffer and the
//! identifier store. The decision of *what* to do is made here, as a pure
//! function of an observed state, so each case is testable on its own; the
//! `DataManager` then executes the chosen plan.
//!
//! Cases are evaluated top to bottom; the first match wins:
//!
//! | case | buffered insert | KVS row | condition |
//! |------|-----------------|---------|-----------|
//! | A    | authoritative   | no      | tombstone exists, older than `ts` |
//! | B    | authoritative   | yes     | tombstone (if any) older than `ts` |
//! | C    | none            | yes     | KVS older than `ts` |
//! | D    | shadowed        | yes     | KVS older than `ts` |
//!
//! Unless forced, every case also requires `ts` to be strictly newer than the
//! KVS and insert timestamps.

use vqcache_core::{newer, Error, Kvs, KvsRecord, ObjectId, Result, Timestamp, Vector};
use vqcache_storage::VQueue;

/// Everything `UpdateTimestamp` reads before deciding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedState {
    /// Vector of the authoritative buffered insert
    pub vector: Option<Vector>,
    /// Buffered insert timestamp, `0` if none
    pub insert_ts: Timestamp,
    /// Buffered tombstone timestamp, `0` if none
    pub delete_ts: Timestamp,
    /// Whether the buffered insert is authoritative
    pub authoritative: bool,
    /// Committed row, if any
    pub committed: Option<KvsRecord>,
}

impl ObservedState {
    /// Read the current state of `key` from the queue and the store
    pub fn observe(vqueue: &VQueue, kvs: &dyn Kvs, key: &str) -> Self {
        let lookup = vqueue.get_vector_with_timestamp(key);
        Self {
            vector: lookup.vector,
            insert_ts: lookup.insert_ts,
            delete_ts: lookup.delete_ts,
            authoritative: lookup.exists,
            committed: kvs.get(key),
        }
    }

    fn committed_ts(&self) -> Timestamp {
        self.committed.map(|r| r.timestamp).unwrap_or(0)
    }

    fn is_buffered(&self) -> bool {
        self.insert_ts != 0 || self.delete_ts != 0
    }
}

/// Action chosen for one `UpdateTimestamp` call
#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePlan {
    /// Case A: re-push the buffered insert at the new timestamp and retire
    /// the older tombstone
    ReviveBuffered {
        /// Vector to re-push
        vector: Vector,
    },
    /// Case B: re-push the buffered insert and refresh the committed row
    RefreshBufferedAndCommitted {
        /// Vector to re-push
        vector: Vector,
        /// Object id of the committed row
        object_id: ObjectId,
        /// Push a tombstone at `ts - 1` because none was buffered
        fence_tombstone: bool,
    },
    /// Case C: refresh the committed row only
    RefreshCommitted {
        /// Object id of the committed row
        object_id: ObjectId,
        /// Pop the now-obsolete buffered tombstone
        pop_tombstone: bool,
    },
    /// Case D: refresh the committed row and resolve the shadowed insert
    RestoreCommitted {
        /// Object id of the committed row
        object_id: ObjectId,
        /// Re-fetch the vector from the index and re-push it
        refetch: bool,
    },
}

impl UpdatePlan {
    /// Decide what an update of `key` to `ts` should do
    ///
    /// # Errors
    ///
    /// - `EmptyKey` / `ZeroTimestamp` for invalid input
    /// - `ObjectNotFound` if neither buffer nor the store has the key
    /// - `NewerObjectExists` if a non-forced update is stale
    /// - `NothingToUpdate` if no case matches
    pub fn decide(key: &str, state: &ObservedState, ts: Timestamp, force: bool) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if !force && ts <= 0 {
            return Err(Error::ZeroTimestamp);
        }

        let kts = state.committed_ts();
        let its = state.insert_ts;
        let dts = state.delete_ts;

        if !state.is_buffered() && state.committed.is_none() {
            return Err(Error::ObjectNotFound(key.to_owned()));
        }
        if !force && (ts <= kts || ts <= its) {
            return Err(Error::newer_exists(key, ts));
        }

        match (state.authoritative, state.committed, state.vector.as_ref()) {
            (true, None, Some(vector)) if dts != 0 && dts < ts && (force || its < ts) => {
                Ok(UpdatePlan::ReviveBuffered {
                    vector: vector.clone(),
                })
            }
            (true, Some(record), Some(vector))
                if dts < ts && (force || (kts < ts && its < ts)) =>
            {
                Ok(UpdatePlan::RefreshBufferedAndCommitted {
                    vector: vector.clone(),
                    object_id: record.object_id,
                    fence_tombstone: dts == 0,
                })
            }
            (false, Some(record), _) if its == 0 && (force || kts < ts) => {
                Ok(UpdatePlan::RefreshCommitted {
                    object_id: record.object_id,
                    pop_tombstone: dts != 0 && (force || dts < ts),
                })
            }
            (false, Some(record), vector) if its != 0 && (force || kts < ts) => {
                Ok(UpdatePlan::RestoreCommitted {
                    object_id: record.object_id,
                    refetch: vector.is_none() && newer(its, dts),
                })
            }
            _ => Err(Error::NothingToUpdate(key.to_owned())),
        }
    }

    /// Short label for logging
    pub fn case(&self) -> &'static str {
        match self {
            UpdatePlan::ReviveBuffered { .. } => "A",
            UpdatePlan::RefreshBufferedAndCommitted { .. } => "B",
            UpdatePlan::RefreshCommitted { .. } => "C",
            UpdatePlan::RestoreCommitted { .. } => "D",
        }
    }
}
