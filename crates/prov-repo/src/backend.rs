use prov_types::{Artifact, ArtifactSet, ContentId, Inputs};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Capability, RepoError, RepoResult};
use crate::index::RepoIndex;
use crate::journal::JournalOp;
use crate::permissions::{Permissions, RepoPermissions};
use crate::record::ValueStorage;

/// Operation logic shared by the single-store repos.
///
/// Each method takes the index its caller has already locked. Mutations hand
/// the op to `log` before touching the index; a failing `log` aborts the
/// mutation with the index unchanged.
#[derive(Debug)]
pub(crate) struct Backend {
    pub name: String,
    pub permissions: Permissions,
    pub storage: ValueStorage,
}

impl Backend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Permissions::new(RepoPermissions::all()),
            storage: ValueStorage::default(),
        }
    }

    fn check(&self, capability: Capability) -> RepoResult<()> {
        self.permissions.check(&self.name, capability)
    }

    pub fn contains(&self, index: &RepoIndex, id: &ContentId) -> RepoResult<bool> {
        self.check(Capability::Read)?;
        Ok(index.contains(id))
    }

    pub fn put<L>(&self, index: &mut RepoIndex, artifact: &Artifact, log: L) -> RepoResult<()>
    where
        L: FnOnce(&JournalOp) -> RepoResult<()>,
    {
        self.check(Capability::Write)?;
        self.insert(index, artifact, log)
    }

    /// Store without the write-permission check. Used to seed a repo.
    pub fn insert<L>(&self, index: &mut RepoIndex, artifact: &Artifact, log: L) -> RepoResult<()>
    where
        L: FnOnce(&JournalOp) -> RepoResult<()>,
    {
        if index.contains(&artifact.id) {
            return Err(RepoError::KeyExists(artifact.id.clone()));
        }
        let value_shared = index.value_refs(&artifact.value_id) > 0;
        let record = self.storage.store(artifact)?;
        let op = JournalOp::PutArtifact { record };
        if let Err(e) = log(&op) {
            if let JournalOp::PutArtifact { record } = &op {
                self.storage.rollback(record, value_shared);
            }
            return Err(e);
        }
        index.apply(op);
        debug!(repo = %self.name, id = %artifact.id.short(), name = %artifact.name, "artifact stored");
        Ok(())
    }

    pub fn get_by_id(&self, index: &RepoIndex, id: &ContentId) -> RepoResult<Artifact> {
        self.check(Capability::Read)?;
        let record = index
            .get(id)
            .ok_or_else(|| RepoError::ArtifactNotFound(id.clone()))?;
        self.storage.load(record)
    }

    pub fn get_by_value_id(&self, index: &RepoIndex, value_id: &ContentId) -> RepoResult<Artifact> {
        self.check(Capability::Read)?;
        let record = index
            .first_by_value(value_id)
            .ok_or_else(|| RepoError::ValueNotFound(value_id.clone()))?;
        self.storage.load(record)
    }

    pub fn get_value(&self, index: &RepoIndex, id: &ContentId) -> RepoResult<Value> {
        self.check(Capability::Read)?;
        let record = index
            .get(id)
            .ok_or_else(|| RepoError::ArtifactNotFound(id.clone()))?;
        self.storage.load_value(record)
    }

    pub fn get_inputs(&self, index: &RepoIndex, id: &ContentId) -> RepoResult<Inputs> {
        self.check(Capability::Read)?;
        let record = index
            .get(id)
            .ok_or_else(|| RepoError::ArtifactNotFound(id.clone()))?;
        self.storage.load_inputs(record)
    }

    /// Metadata goes first, so a record never outlives its blobs. A blob that
    /// then fails to delete is orphaned and the error is returned.
    pub fn delete<L>(&self, index: &mut RepoIndex, id: &ContentId, log: L) -> RepoResult<()>
    where
        L: FnOnce(&JournalOp) -> RepoResult<()>,
    {
        self.check(Capability::Delete)?;
        let value_id = match index.get(id) {
            Some(record) => {
                self.storage.ensure_discardable(record)?;
                record.value_id.clone()
            }
            None => return Err(RepoError::ArtifactNotFound(id.clone())),
        };
        let value_shared = index.value_refs(&value_id) > 1;
        log(&JournalOp::DeleteArtifact { id: id.clone() })?;

        if let Some(record) = index.remove(id) {
            if let Err(e) = self.storage.discard(&record, value_shared) {
                warn!(repo = %self.name, id = %id.short(), error = %e, "orphaned blobs after delete");
                return Err(e);
            }
        }
        debug!(repo = %self.name, id = %id.short(), "artifact deleted");
        Ok(())
    }

    pub fn artifact_ids(&self, index: &RepoIndex) -> RepoResult<Vec<ContentId>> {
        self.check(Capability::Read)?;
        Ok(index.artifact_ids())
    }

    // ---- sets ----

    pub fn put_set<L>(&self, index: &mut RepoIndex, set: &ArtifactSet, log: L) -> RepoResult<()>
    where
        L: FnOnce(&JournalOp) -> RepoResult<()>,
    {
        self.check(Capability::Write)?;
        if index.contains_set(&set.id) {
            return Err(RepoError::SetExists(set.id.clone()));
        }
        let op = JournalOp::PutSet { set: set.clone() };
        log(&op)?;
        index.apply(op);
        debug!(repo = %self.name, id = %set.id.short(), name = ?set.name, "artifact set stored");
        Ok(())
    }

    pub fn get_set_by_id(&self, index: &RepoIndex, id: &ContentId) -> RepoResult<ArtifactSet> {
        self.check(Capability::Read)?;
        index
            .get_set(id)
            .cloned()
            .ok_or_else(|| RepoError::SetNotFound(id.clone()))
    }

    pub fn get_set_by_name(&self, index: &RepoIndex, name: &str) -> RepoResult<ArtifactSet> {
        self.check(Capability::Read)?;
        index
            .set_by_name(name)
            .cloned()
            .ok_or_else(|| RepoError::SetNameNotFound(name.to_string()))
    }

    pub fn contains_set(&self, index: &RepoIndex, id: &ContentId) -> RepoResult<bool> {
        self.check(Capability::Read)?;
        Ok(index.contains_set(id))
    }

    pub fn delete_set<L>(&self, index: &mut RepoIndex, id: &ContentId, log: L) -> RepoResult<()>
    where
        L: FnOnce(&JournalOp) -> RepoResult<()>,
    {
        self.check(Capability::Delete)?;
        if !index.contains_set(id) {
            return Err(RepoError::SetNotFound(id.clone()));
        }
        log(&JournalOp::DeleteSet { id: id.clone() })?;
        index.remove_set(id);
        debug!(repo = %self.name, id = %id.short(), "artifact set deleted");
        Ok(())
    }

    pub fn set_ids(&self, index: &RepoIndex) -> RepoResult<Vec<ContentId>> {
        self.check(Capability::Read)?;
        Ok(index.set_ids())
    }
}
