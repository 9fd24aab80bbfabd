//! In-memory repository for tests, notebooks, and cache layers.
//!
//! [`MemoryRepo`] keeps its index behind a `RwLock`. Values and inputs stay
//! inline unless a [`BlobStore`] is attached, in which case they are written
//! there and only metadata is indexed. Data is lost when the repo is dropped.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use prov_store::BlobStore;
use prov_types::{Artifact, ArtifactSet, ContentId, Inputs};
use serde_json::Value;

use crate::backend::Backend;
use crate::error::RepoResult;
use crate::index::RepoIndex;
use crate::journal::JournalOp;
use crate::permissions::{Permissions, RepoPermissions};
use crate::record::ValueStorage;
use crate::traits::Repo;

/// Repo whose index lives entirely in process memory.
#[derive(Debug)]
pub struct MemoryRepo {
    backend: Backend,
    index: RwLock<RepoIndex>,
}

fn unlogged(_: &JournalOp) -> RepoResult<()> {
    Ok(())
}

impl MemoryRepo {
    /// An empty repo named `"memory"` with every capability enabled.
    pub fn new() -> Self {
        Self {
            backend: Backend::new("memory"),
            index: RwLock::new(RepoIndex::default()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.backend.name = name.into();
        self
    }

    pub fn with_permissions(mut self, flags: RepoPermissions) -> Self {
        self.backend.permissions = Permissions::new(flags);
        self
    }

    /// Delegate values and inputs to `blobs`.
    pub fn with_blobstore(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.backend.storage = ValueStorage::new(Some(blobs));
        self
    }

    /// Pre-populate the repo, bypassing the `write` flag.
    ///
    /// This is how a read-only layer gets its contents. Fails with
    /// [`KeyExists`](crate::RepoError::KeyExists) on a duplicate id.
    pub fn with_artifacts<I>(self, artifacts: I) -> RepoResult<Self>
    where
        I: IntoIterator<Item = Artifact>,
    {
        {
            let mut index = self.index.write()?;
            for artifact in artifacts {
                self.backend.insert(&mut index, &artifact, unlogged)?;
            }
        }
        Ok(self)
    }

    pub fn blobstore(&self) -> Option<&Arc<dyn BlobStore>> {
        self.backend.storage.blobstore()
    }

    /// Number of stored artifacts, regardless of the `read` flag.
    pub fn len(&self) -> usize {
        self.read_index().map(|index| index.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_index(&self) -> RepoResult<RwLockReadGuard<'_, RepoIndex>> {
        Ok(self.index.read()?)
    }

    fn write_index(&self) -> RepoResult<RwLockWriteGuard<'_, RepoIndex>> {
        Ok(self.index.write()?)
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl Repo for MemoryRepo {
    fn name(&self) -> &str {
        &self.backend.name
    }

    fn permissions(&self) -> &Permissions {
        &self.backend.permissions
    }

    fn contains(&self, id: &ContentId) -> RepoResult<bool> {
        self.backend.contains(&*self.read_index()?, id)
    }

    fn put(&self, artifact: &Artifact) -> RepoResult<()> {
        self.backend.put(&mut *self.write_index()?, artifact, unlogged)
    }

    fn get_by_id(&self, id: &ContentId) -> RepoResult<Artifact> {
        self.backend.get_by_id(&*self.read_index()?, id)
    }

    fn get_by_value_id(&self, value_id: &ContentId) -> RepoResult<Artifact> {
        self.backend.get_by_value_id(&*self.read_index()?, value_id)
    }

    fn get_value(&self, id: &ContentId) -> RepoResult<Value> {
        self.backend.get_value(&*self.read_index()?, id)
    }

    fn get_inputs(&self, id: &ContentId) -> RepoResult<Inputs> {
        self.backend.get_inputs(&*self.read_index()?, id)
    }

    fn delete(&self, id: &ContentId) -> RepoResult<()> {
        self.backend.delete(&mut *self.write_index()?, id, unlogged)
    }

    fn artifact_ids(&self) -> RepoResult<Vec<ContentId>> {
        self.backend.artifact_ids(&*self.read_index()?)
    }

    fn put_set(&self, set: &ArtifactSet) -> RepoResult<()> {
        self.backend.put_set(&mut *self.write_index()?, set, unlogged)
    }

    fn get_set_by_id(&self, id: &ContentId) -> RepoResult<ArtifactSet> {
        self.backend.get_set_by_id(&*self.read_index()?, id)
    }

    fn get_set_by_name(&self, name: &str) -> RepoResult<ArtifactSet> {
        self.backend.get_set_by_name(&*self.read_index()?, name)
    }

    fn contains_set(&self, id: &ContentId) -> RepoResult<bool> {
        self.backend.contains_set(&*self.read_index()?, id)
    }

    fn delete_set(&self, id: &ContentId) -> RepoResult<()> {
        self.backend.delete_set(&mut *self.write_index()?, id, unlogged)
    }

    fn set_ids(&self) -> RepoResult<Vec<ContentId>> {
        self.backend.set_ids(&*self.read_index()?)
    }
}
