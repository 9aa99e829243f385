//! vqcache - Timestamp-ordered write buffer for vector search agents
//!
//! vqcache absorbs vector inserts and deletes before they are committed to an
//! ANN index, and answers reads by merging the buffers with the committed
//! identifier store.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use vqcache::{DataManager, Kvs, MemoryKvs};
//!
//! let dm = DataManager::new(MemoryKvs::new());
//! dm.vqueue().push_insert("doc-1", Arc::from(vec![0.1f32, 0.2, 0.3]), 100);
//! assert_eq!(dm.exists("doc-1"), Some(0));
//!
//! dm.kvs().set("doc-2", 7, 50).unwrap();
//! assert_eq!(dm.exists("doc-2"), Some(7));
//! ```
//!
//! # Architecture
//!
//! - [`VQueue`]: paired insert and delete buffers with last-write-wins merge
//!   reads and cutoff-bounded flushes
//! - [`DataManager`]: merge reads and timestamp updates across the queue and
//!   a [`Kvs`]
//! - [`CacheConfig`]: buffer sizing from `vqcache.toml`

pub use vqcache_core::{
    newer, now_nanos, CancelToken, Entry, Error, Kvs, KvsRecord, Lookup, ObjectId, Result,
    Timestamp, Vector, VectorSource,
};
pub use vqcache_engine::{CacheConfig, DataManager, ObservedState, UpdatePlan, CONFIG_FILE_NAME};
pub use vqcache_storage::{Buffer, FlushStats, MemoryKvs, PushOutcome, QueueStats, VQueue};
