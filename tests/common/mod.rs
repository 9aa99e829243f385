//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Once};

pub use vqcache::{
    CancelToken, DataManager, Error, Kvs, KvsRecord, Lookup, MemoryKvs, ObjectId, Result,
    Timestamp, VQueue, Vector,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness so it shows up on failure.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Builders
// ============================================================================

/// Vector from a slice.
pub fn vector(values: &[f32]) -> Vector {
    Arc::from(values.to_vec())
}

/// Deterministic vector for key index `i`.
pub fn vector_for(i: usize, dim: usize) -> Vector {
    (0..dim).map(|d| (i * dim + d) as f32).collect::<Vec<_>>().into()
}

/// Fresh manager over an in-memory store.
pub fn manager() -> DataManager<MemoryKvs> {
    init_tracing();
    DataManager::new(MemoryKvs::new())
}

/// Fresh manager sharing its store through an `Arc`.
pub fn shared_manager() -> Arc<DataManager<Arc<MemoryKvs>>> {
    init_tracing();
    Arc::new(DataManager::new(Arc::new(MemoryKvs::new())))
}

/// Index stand-in that answers every object id with a constant vector.
pub fn index_source(object_id: ObjectId) -> Result<Vector> {
    Ok(Arc::from(vec![object_id as f32; 4]))
}

// ============================================================================
// Collectors
// ============================================================================

/// Drain all inserts up to `cutoff`, in delivery order.
pub fn drain_inserts(vq: &VQueue, cutoff: Timestamp) -> Vec<(String, Timestamp)> {
    let mut out = Vec::new();
    vq.range_pop_insert(cutoff, &CancelToken::new(), |key, _, ts| {
        out.push((key.to_string(), ts));
        true
    });
    out
}

/// Drain all tombstones up to `cutoff`, in delivery order.
pub fn drain_deletes(vq: &VQueue, cutoff: Timestamp) -> Vec<(String, Timestamp)> {
    let mut out = Vec::new();
    vq.range_pop_delete(cutoff, &CancelToken::new(), |key, ts| {
        out.push((key.to_string(), ts));
        true
    });
    out
}

/// Every `(key, object_id, timestamp)` listed by the manager, sorted.
pub fn listed<K: Kvs>(dm: &DataManager<K>) -> Vec<(String, ObjectId, Timestamp)> {
    let mut out = Vec::new();
    dm.list_object_func(&CancelToken::new(), |key, oid, ts| {
        out.push((key.to_string(), oid, ts));
        true
    });
    out.sort();
    out
}
