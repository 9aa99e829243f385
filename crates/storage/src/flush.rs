//! Flush selection
//!
//! Bulk extraction of buffered entries that are eligible for committing to
//! the ANN index as of a cutoff timestamp.
//!
//! ## Flush Sequence
//!
//! ```text
//! 1. Snapshot every entry with timestamp <= cutoff
//! 2. (inserts) Drop entries shadowed by a strictly newer tombstone
//! 3. Sort newest first, ties by key
//! 4. Deliver one entry at a time; pop it after the callback accepts it
//! 5. Stop at the first rejected delivery or on cancellation
//! ```
//!
//! Pops are fenced on the snapshotted timestamp: if a concurrent push
//! replaced the entry while the flush was in flight, the newer entry stays
//! buffered for the next flush instead of being dropped.

use crate::vqueue::VQueue;
use tracing::debug;
use vqcache_core::{newer, CancelToken, Entry, Timestamp, Vector};

/// Outcome of one flush invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Entries handed to the callback and popped; an entry replaced by a
    /// concurrent push while in flight is not counted
    pub delivered: usize,
    /// Insert entries dropped without delivery (shadowed or retired)
    pub discarded: usize,
    /// Whether the flush ended before exhausting its batch
    pub stopped_early: bool,
}

impl VQueue {
    /// Drain buffered inserts with `timestamp <= cutoff`
    ///
    /// Inserts shadowed by a strictly newer tombstone are popped and dropped
    /// while collecting. The rest are delivered newest first to
    /// `f(key, vector, timestamp)`; each accepted entry is popped. Delivery
    /// stops without popping the current entry when `f` returns false or
    /// `cancel` fires.
    pub fn range_pop_insert<F>(
        &self,
        cutoff: Timestamp,
        cancel: &CancelToken,
        mut f: F,
    ) -> FlushStats
    where
        F: FnMut(&str, &Vector, Timestamp) -> bool,
    {
        let mut stats = FlushStats::default();
        let mut batch = Vec::with_capacity(self.ivq_len());

        for entry in self.inserts.snapshot(|ts| !newer(ts, cutoff)) {
            if cancel.is_cancelled() {
                stats.stopped_early = true;
                return stats;
            }
            let shadowed = self
                .deletes
                .timestamp(&entry.key)
                .is_some_and(|dts| newer(dts, entry.timestamp));
            if shadowed {
                if self
                    .inserts
                    .remove_if(&entry.key, |ts| ts == entry.timestamp)
                    .is_some()
                {
                    stats.discarded += 1;
                }
                continue;
            }
            batch.push(entry);
        }
        sort_newest_first(&mut batch);

        for entry in batch {
            if cancel.is_cancelled() {
                stats.stopped_early = true;
                break;
            }
            let Some(vector) = entry.vector.as_ref() else {
                continue;
            };
            if !f(&entry.key, vector, entry.timestamp) {
                stats.stopped_early = true;
                break;
            }
            let unchanged = |ts: Timestamp| ts == entry.timestamp;
            if self.inserts.remove_if(&entry.key, unchanged).is_some() {
                stats.delivered += 1;
            }
        }

        debug!(
            target: "vqcache::flush",
            cutoff,
            delivered = stats.delivered,
            discarded = stats.discarded,
            stopped_early = stats.stopped_early,
            "Insert flush completed"
        );
        stats
    }

    /// Drain buffered tombstones with `timestamp <= cutoff`
    ///
    /// Tombstones are delivered newest first to `f(key, timestamp)`. After an
    /// accepted delivery the tombstone is popped, together with any buffered
    /// insert for the same key that is older than or equal to it.
    pub fn range_pop_delete<F>(
        &self,
        cutoff: Timestamp,
        cancel: &CancelToken,
        mut f: F,
    ) -> FlushStats
    where
        F: FnMut(&str, Timestamp) -> bool,
    {
        let mut stats = FlushStats::default();
        let mut batch = Vec::with_capacity(self.dvq_len());

        for entry in self.deletes.snapshot(|ts| !newer(ts, cutoff)) {
            if cancel.is_cancelled() {
                stats.stopped_early = true;
                return stats;
            }
            batch.push(entry);
        }
        sort_newest_first(&mut batch);

        for entry in batch {
            if cancel.is_cancelled() {
                stats.stopped_early = true;
                break;
            }
            if !f(&entry.key, entry.timestamp) {
                stats.stopped_early = true;
                break;
            }
            // A newer tombstone pushed meanwhile stays, and so does the insert
            // it would retire
            let unchanged = |ts: Timestamp| ts == entry.timestamp;
            if self.deletes.remove_if(&entry.key, unchanged).is_none() {
                continue;
            }
            stats.delivered += 1;
            if self
                .inserts
                .remove_if(&entry.key, |its| !newer(its, entry.timestamp))
                .is_some()
            {
                stats.discarded += 1;
            }
        }

        debug!(
            target: "vqcache::flush",
            cutoff,
            delivered = stats.delivered,
            retired_inserts = stats.discarded,
            stopped_early = stats.stopped_early,
            "Delete flush completed"
        );
        stats
    }
}

fn sort_newest_first(batch: &mut [Entry]) {
    batch.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.key.cmp(&b.key))
    });
}
