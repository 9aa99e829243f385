//! Core types and traits for vqcache
//!
//! This crate defines the foundational types shared by the write buffers and
//! the merge-read layer:
//! - Timestamp / ObjectId / Vector: the scalar vocabulary of the cache
//! - Entry: one buffered insert or tombstone
//! - Lookup: result of merging the insert and delete buffers for one key
//! - Error: error type hierarchy
//! - Traits: collaborator contracts (Kvs, VectorSource)
//! - CancelToken: cooperative cancellation for long scans

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod error;
pub mod traits;
pub mod types;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use traits::{Kvs, VectorSource};
pub use types::{newer, now_nanos, Entry, KvsRecord, Lookup, ObjectId, Timestamp, Vector};
