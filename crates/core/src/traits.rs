//! Collaborator traits
//!
//! The cache itself holds no connection, file or socket state. The committed
//! identifier store and the ANN index are supplied by the caller through the
//! traits defined here.

use std::sync::Arc;

use crate::error::Result;
use crate::types::{KvsRecord, ObjectId, Timestamp, Vector};

/// Identifier store mapping an external key to a committed object id
///
/// Thread safety: all methods may be called concurrently from multiple
/// threads (requires Send + Sync).
pub trait Kvs: Send + Sync {
    /// Get the committed row for `key`, if any
    fn get(&self, key: &str) -> Option<KvsRecord>;

    /// Create or refresh the committed row for `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn set(&self, key: &str, object_id: ObjectId, timestamp: Timestamp) -> Result<()>;

    /// Visit every committed row; stops when `f` returns false
    fn range(&self, f: &mut dyn FnMut(&str, ObjectId, Timestamp) -> bool);

    /// Number of committed rows
    fn len(&self) -> usize;

    /// Whether the store has no rows
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Kvs + ?Sized> Kvs for Arc<T> {
    fn get(&self, key: &str) -> Option<KvsRecord> {
        (**self).get(key)
    }

    fn set(&self, key: &str, object_id: ObjectId, timestamp: Timestamp) -> Result<()> {
        (**self).set(key, object_id, timestamp)
    }

    fn range(&self, f: &mut dyn FnMut(&str, ObjectId, Timestamp) -> bool) {
        (**self).range(f)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Source of committed vectors, bridging to the ANN index
pub trait VectorSource: Send + Sync {
    /// Fetch the vector stored for `object_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the index has no such object or cannot be read.
    fn fetch_vector(&self, object_id: ObjectId) -> Result<Vector>;
}

impl<F> VectorSource for F
where
    F: Fn(ObjectId) -> Result<Vector> + Send + Sync,
{
    fn fetch_vector(&self, object_id: ObjectId) -> Result<Vector> {
        self(object_id)
    }
}
