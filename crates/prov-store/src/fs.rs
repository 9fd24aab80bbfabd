use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use prov_types::ContentId;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{BlobError, BlobResult};
use crate::traits::BlobStore;

/// Filesystem-backed blob store with git-style 2-char sharding.
///
/// Layout: `<root>/blobs/<first 2 chars>/<remaining chars>`. Keys shorter than
/// three characters are stored unsharded under `<root>/blobs/_/`.
pub struct FsBlobStore {
    blobs_dir: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating `root/blobs/` if needed.
    pub fn open(root: impl AsRef<Path>) -> BlobResult<Self> {
        let blobs_dir = root.as_ref().join("blobs");
        fs::create_dir_all(&blobs_dir)?;
        Ok(Self { blobs_dir })
    }

    /// Directory holding the shards.
    pub fn blobs_dir(&self) -> &Path {
        &self.blobs_dir
    }

    fn blob_path(&self, key: &ContentId) -> BlobResult<PathBuf> {
        let key = key.as_str();
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(if key.len() > 2 {
            self.blobs_dir.join(&key[..2]).join(&key[2..])
        } else {
            self.blobs_dir.join("_").join(key)
        })
    }
}

impl BlobStore for FsBlobStore {
    fn contains(&self, key: &ContentId) -> BlobResult<bool> {
        Ok(self.blob_path(key)?.exists())
    }

    fn get(&self, key: &ContentId) -> BlobResult<Vec<u8>> {
        let path = self.blob_path(key)?;
        fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                BlobError::NotFound(key.clone())
            } else {
                BlobError::Io(e)
            }
        })
    }

    fn put(&self, key: &ContentId, data: &[u8]) -> BlobResult<()> {
        let path = self.blob_path(key)?;
        if path.exists() {
            return Ok(());
        }
        let shard_dir = path
            .parent()
            .ok_or_else(|| BlobError::InvalidKey(key.to_string()))?;
        fs::create_dir_all(shard_dir)?;

        // Write to a temp file in the same directory, then rename into place.
        let mut tmp = NamedTempFile::new_in(shard_dir)?;
        tmp.write_all(data)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!(key = %key.short(), len = data.len(), "blob written");
        Ok(())
    }

    fn delete(&self, key: &ContentId) -> BlobResult<bool> {
        let path = self.blob_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for FsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlobStore")
            .field("blobs_dir", &self.blobs_dir)
            .finish()
    }
}
