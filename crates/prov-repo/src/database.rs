//! Durable repository backed by an append-only journal.
//!
//! [`DatabaseRepo`] replays its journal into an in-memory index on open and
//! appends every mutation to the journal before applying it. Index and
//! journal share one mutex, so the on-disk order of mutations always matches
//! the order in which they became visible.
//!
//! A journal file must have a single owning process; concurrent writers from
//! separate processes are not coordinated.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use prov_store::BlobStore;
use prov_types::{Artifact, ArtifactSet, ContentId, Inputs};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::backend::Backend;
use crate::error::{Capability, RepoResult};
use crate::index::RepoIndex;
use crate::journal::{Journal, SyncMode};
use crate::permissions::{Permissions, RepoPermissions};
use crate::record::ValueStorage;
use crate::traits::Repo;

/// Where and how a [`DatabaseRepo`] persists its journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync_mode: SyncMode::default(),
        }
    }

    pub fn sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }
}

struct DbState {
    index: RepoIndex,
    journal: Journal,
}

/// Journal-backed repo.
pub struct DatabaseRepo {
    backend: Backend,
    path: PathBuf,
    state: Mutex<DbState>,
}

impl DatabaseRepo {
    /// Open (or create) the journal at `config.path` and rebuild the index.
    pub fn open(config: DatabaseConfig) -> RepoResult<Self> {
        let (journal, ops) = Journal::open(&config.path, config.sync_mode)?;
        let mut index = RepoIndex::default();
        let replayed = ops.len();
        for op in ops {
            index.apply(op);
        }
        info!(
            path = %config.path.display(),
            replayed,
            artifacts = index.len(),
            "database repo opened"
        );
        Ok(Self {
            backend: Backend::new("database"),
            path: config.path,
            state: Mutex::new(DbState { index, journal }),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.backend.name = name.into();
        self
    }

    pub fn with_permissions(mut self, flags: RepoPermissions) -> Self {
        self.backend.permissions = Permissions::new(flags);
        self
    }

    /// Delegate values and inputs to `blobs`. Records written while a blob
    /// store was attached can only be read back with one attached.
    pub fn with_blobstore(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.backend.storage = ValueStorage::new(Some(blobs));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn blobstore(&self) -> Option<&Arc<dyn BlobStore>> {
        self.backend.storage.blobstore()
    }

    /// Number of stored artifacts, regardless of the `read` flag.
    pub fn len(&self) -> usize {
        self.lock().map(|state| state.index.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the journal in bytes.
    pub fn journal_len(&self) -> RepoResult<u64> {
        Ok(self.lock()?.journal.offset())
    }

    /// Rewrite the journal so it holds only the live artifacts and sets.
    ///
    /// Requires `write`. Returns the number of bytes reclaimed.
    pub fn compact(&self) -> RepoResult<u64> {
        self.backend
            .permissions
            .check(&self.backend.name, Capability::Write)?;
        let mut state = self.lock()?;
        let before = state.journal.offset();
        let ops = state.index.snapshot_ops();
        state.journal.rewrite(&ops)?;
        let after = state.journal.offset();
        info!(
            repo = %self.backend.name,
            entries = ops.len(),
            before,
            after,
            "journal compacted"
        );
        Ok(before.saturating_sub(after))
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, DbState>> {
        Ok(self.state.lock()?)
    }
}

impl std::fmt::Debug for DatabaseRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseRepo")
            .field("name", &self.backend.name)
            .field("path", &self.path)
            .finish()
    }
}

impl Repo for DatabaseRepo {
    fn name(&self) -> &str {
        &self.backend.name
    }

    fn permissions(&self) -> &Permissions {
        &self.backend.permissions
    }

    fn contains(&self, id: &ContentId) -> RepoResult<bool> {
        self.backend.contains(&self.lock()?.index, id)
    }

    fn put(&self, artifact: &Artifact) -> RepoResult<()> {
        let mut state = self.lock()?;
        let DbState { index, journal } = &mut *state;
        self.backend
            .put(index, artifact, |op| journal.append(op).map(drop))
    }

    fn get_by_id(&self, id: &ContentId) -> RepoResult<Artifact> {
        self.backend.get_by_id(&self.lock()?.index, id)
    }

    fn get_by_value_id(&self, value_id: &ContentId) -> RepoResult<Artifact> {
        self.backend.get_by_value_id(&self.lock()?.index, value_id)
    }

    fn get_value(&self, id: &ContentId) -> RepoResult<Value> {
        self.backend.get_value(&self.lock()?.index, id)
    }

    fn get_inputs(&self, id: &ContentId) -> RepoResult<Inputs> {
        self.backend.get_inputs(&self.lock()?.index, id)
    }

    fn delete(&self, id: &ContentId) -> RepoResult<()> {
        let mut state = self.lock()?;
        let DbState { index, journal } = &mut *state;
        self.backend
            .delete(index, id, |op| journal.append(op).map(drop))
    }

    fn artifact_ids(&self) -> RepoResult<Vec<ContentId>> {
        self.backend.artifact_ids(&self.lock()?.index)
    }

    fn put_set(&self, set: &ArtifactSet) -> RepoResult<()> {
        let mut state = self.lock()?;
        let DbState { index, journal } = &mut *state;
        self.backend
            .put_set(index, set, |op| journal.append(op).map(drop))
    }

    fn get_set_by_id(&self, id: &ContentId) -> RepoResult<ArtifactSet> {
        self.backend.get_set_by_id(&self.lock()?.index, id)
    }

    fn get_set_by_name(&self, name: &str) -> RepoResult<ArtifactSet> {
        self.backend.get_set_by_name(&self.lock()?.index, name)
    }

    fn contains_set(&self, id: &ContentId) -> RepoResult<bool> {
        self.backend.contains_set(&self.lock()?.index, id)
    }

    fn delete_set(&self, id: &ContentId) -> RepoResult<()> {
        let mut state = self.lock()?;
        let DbState { index, journal } = &mut *state;
        self.backend
            .delete_set(index, id, |op| journal.append(op).map(drop))
    }

    fn set_ids(&self) -> RepoResult<Vec<ContentId>> {
        self.backend.set_ids(&self.lock()?.index)
    }
}
