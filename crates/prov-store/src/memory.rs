use std::collections::HashMap;
use std::sync::RwLock;

use prov_types::ContentId;

use crate::error::{BlobError, BlobResult};
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock` and
/// cloned on read/write.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<ContentId, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Sorted list of all keys.
    pub fn keys(&self) -> Vec<ContentId> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut keys: Vec<ContentId> = map.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn contains(&self, key: &ContentId) -> BlobResult<bool> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    fn get(&self, key: &ContentId) -> BlobResult<Vec<u8>> {
        let map = self.blobs.read().expect("lock poisoned");
        map.get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.clone()))
    }

    fn put(&self, key: &ContentId, data: &[u8]) -> BlobResult<()> {
        let mut map = self.blobs.write().expect("lock poisoned");
        map.entry(key.clone()).or_insert_with(|| data.to_vec());
        Ok(())
    }

    fn delete(&self, key: &ContentId) -> BlobResult<bool> {
        let mut map = self.blobs.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
