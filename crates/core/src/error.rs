//! Error types for vqcache
//!
//! Errors here are local decision outcomes of the merge-read layer, never
//! I/O failures of the cache itself. Buffer pushes and pops do not fail;
//! they silently ignore invalid input.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::types::{ObjectId, Timestamp};
use thiserror::Error;

/// Result type alias for vqcache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for vqcache
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Empty external key
    #[error("empty key")]
    EmptyKey,

    /// Zero or negative timestamp supplied to a non-forced update
    #[error("zero timestamp provided")]
    ZeroTimestamp,

    /// Neither buffer nor the identifier store has the key
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// A non-forced update is not newer than what is already stored
    #[error("newer timestamp object already exists for key {key}, provided timestamp: {timestamp}")]
    NewerObjectExists {
        /// Key being updated
        key: String,
        /// Rejected timestamp
        timestamp: Timestamp,
    },

    /// No update case matched the observed state
    #[error("nothing to be done for update: {0}")]
    NothingToUpdate(String),

    /// External vector fetch failed
    #[error("failed to fetch vector for object {object_id}: {reason}")]
    VectorFetch {
        /// Object whose vector was requested
        object_id: ObjectId,
        /// Reason reported by the vector source
        reason: String,
    },

    /// The identifier store rejected a write
    #[error("kvs error: {0}")]
    Kvs(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Build a `NewerObjectExists` error
    pub fn newer_exists(key: impl Into<String>, timestamp: Timestamp) -> Self {
        Error::NewerObjectExists {
            key: key.into(),
            timestamp,
        }
    }

    /// True for errors that mean "the object is not visible"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectNotFound(_) | Error::EmptyKey)
    }
}
