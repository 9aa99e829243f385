//! Merge-read engine over the vector queue
//!
//! This crate composes the lower layers:
//! - DataManager: existence, fetch, listing and timestamp update across the
//!   buffers and the committed identifier store
//! - UpdatePlan: the pure decision table behind `update_timestamp`
//! - CacheConfig: buffer sizing from `vqcache.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod memstore;
pub mod update;

pub use config::{CacheConfig, CONFIG_FILE_NAME};
pub use memstore::DataManager;
pub use update::{ObservedState, UpdatePlan};
