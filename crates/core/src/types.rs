//! Core types for vqcache
//!
//! This module defines the scalar vocabulary and the records moved between
//! the buffers and the merge-read layer:
//! - Timestamp: caller-supplied logical version (not assumed monotonic)
//! - ObjectId: numeric identifier assigned by the committed index
//! - Vector: shared, immutable vector payload
//! - Entry: one buffered insert or tombstone
//! - Lookup: merged view of both buffers for one key
//! - KvsRecord: one committed row of the identifier store

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Logical version of a write. Zero means "unset".
pub type Timestamp = i64;

/// Internal identifier of a committed object in the ANN index.
pub type ObjectId = u32;

/// Vector payload.
///
/// Shared behind an `Arc` so that snapshots taken by scans and flushes are
/// a reference-count bump, not a copy of the floats.
pub type Vector = Arc<[f32]>;

/// Current wall-clock time in nanoseconds since the Unix epoch.
///
/// Used only to fill in a timestamp when a push is made with `0`.
/// Never returns `0`, so the result is always a valid (set) timestamp.
pub fn now_nanos() -> Timestamp {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (duration.as_nanos() as Timestamp).max(1)
}

/// Last-write-wins ordering predicate.
///
/// Returns true only if `a` is strictly newer than `b`; equal timestamps are
/// never newer, so ties keep whatever is already stored.
#[inline]
pub fn newer(a: Timestamp, b: Timestamp) -> bool {
    a > b
}

/// A single buffered write
///
/// Held by the insert buffer (vector present) or the delete buffer (vector
/// absent, `timestamp` is the tombstone time).
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// External key
    pub key: String,
    /// Vector payload; `None` for tombstones
    pub vector: Option<Vector>,
    /// Logical version of this write
    pub timestamp: Timestamp,
}

impl Entry {
    /// Create an insert entry
    pub fn insert(key: impl Into<String>, vector: Vector, timestamp: Timestamp) -> Self {
        Self {
            key: key.into(),
            vector: Some(vector),
            timestamp,
        }
    }

    /// Create a tombstone
    pub fn tombstone(key: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            key: key.into(),
            vector: None,
            timestamp,
        }
    }

    /// Whether this entry is a tombstone
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.vector.is_none()
    }
}

/// Result of merging the insert and delete buffers for one key
///
/// | insert | delete | exists | timestamps returned |
/// |--------|--------|--------|---------------------|
/// | no     | no     | false  | (0, 0)              |
/// | no     | yes    | false  | (0, dts)            |
/// | yes    | no     | true   | (its, 0)            |
/// | yes    | yes    | its > dts | (its, dts)       |
///
/// `vector` is only populated when `exists` is true.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lookup {
    /// Vector of the authoritative insert, if any
    pub vector: Option<Vector>,
    /// Timestamp of the buffered insert, `0` if none
    pub insert_ts: Timestamp,
    /// Timestamp of the buffered tombstone, `0` if none
    pub delete_ts: Timestamp,
    /// Whether the buffered insert is currently authoritative
    pub exists: bool,
}

impl Lookup {
    /// True if neither buffer holds the key
    #[inline]
    pub fn is_absent(&self) -> bool {
        self.insert_ts == 0 && self.delete_ts == 0
    }

    /// True if the key has a tombstone at least as new as any buffered insert
    #[inline]
    pub fn is_tombstoned(&self) -> bool {
        !self.exists && self.delete_ts != 0
    }
}

/// One committed row of the identifier store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KvsRecord {
    /// Internal object identifier
    pub object_id: ObjectId,
    /// Timestamp of the last committed write
    pub timestamp: Timestamp,
}

impl KvsRecord {
    /// Create a record
    pub fn new(object_id: ObjectId, timestamp: Timestamp) -> Self {
        Self {
            object_id,
            timestamp,
        }
    }
}
