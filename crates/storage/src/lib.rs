//! Storage layer for vqcache
//!
//! This crate implements the write-buffering half of the cache:
//! - Buffer: DashMap-backed timestamped store with a live-count
//! - VQueue: paired insert/delete buffers with merge reads
//! - Flush selection: cutoff-bounded, newest-first extraction
//! - MemoryKvs: in-memory bidirectional identifier store
//!
//! # Concurrency
//!
//! There is no global lock:
//! - Reads and writes lock only the shard holding the key
//! - Insert and delete buffers are independent maps
//! - Scans copy entries out, so callbacks may mutate the queue

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod flush;
pub mod kvs;
pub mod vqueue;

pub use buffer::{Buffer, PushOutcome};
pub use flush::FlushStats;
pub use kvs::MemoryKvs;
pub use vqueue::{QueueStats, VQueue};
