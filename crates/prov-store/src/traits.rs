use prov_types::ContentId;

use crate::error::BlobResult;

/// Content-addressed byte store.
///
/// Keys are content hashes computed by the caller; the store never derives or
/// checks them and never interprets the bytes. All implementations must
/// satisfy these invariants:
/// - `put` of an existing key is a no-op (the same key always carries the
///   same content).
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Check whether a blob exists.
    fn contains(&self, key: &ContentId) -> BlobResult<bool>;

    /// Read a blob. Returns [`BlobError::NotFound`](crate::BlobError::NotFound)
    /// if it does not exist.
    fn get(&self, key: &ContentId) -> BlobResult<Vec<u8>>;

    /// Write a blob under `key`. Idempotent.
    fn put(&self, key: &ContentId, data: &[u8]) -> BlobResult<()>;

    /// Delete a blob. Returns `true` if it existed.
    fn delete(&self, key: &ContentId) -> BlobResult<bool>;
}
