use prov_types::{Artifact, ArtifactSet, ContentId, Inputs};
use serde_json::Value;

use crate::error::RepoResult;
use crate::permissions::Permissions;

/// Capability-gated storage for artifacts and artifact sets.
///
/// All implementations must satisfy these invariants:
/// - The capability check for an operation precedes any lookup: a caller
///   lacking `read`, `write`, or `delete` gets
///   [`PermissionDenied`](crate::RepoError::PermissionDenied) and learns
///   nothing about whether the key exists.
/// - Artifacts are immutable once stored: `put` of an existing id fails with
///   [`KeyExists`](crate::RepoError::KeyExists), atomically with the
///   existence check.
/// - The `id` and `value_id` indexes stay consistent across `put`/`delete`.
/// - Absence is always an error, never a sentinel value.
pub trait Repo: Send + Sync {
    /// Label used in errors and logs.
    fn name(&self) -> &str;

    /// The live capability flags of this repo.
    fn permissions(&self) -> &Permissions;

    /// Whether an artifact with `id` is stored. Requires `read`.
    fn contains(&self, id: &ContentId) -> RepoResult<bool>;

    /// `artifact in repo`: membership by the artifact's id.
    fn contains_artifact(&self, artifact: &Artifact) -> RepoResult<bool> {
        self.contains(&artifact.id)
    }

    /// Store a new artifact. Requires `write`.
    fn put(&self, artifact: &Artifact) -> RepoResult<()>;

    /// Whether a direct `put` can land somewhere in this repo.
    ///
    /// For a single store this is its `write` flag. Composite repos also
    /// require a member that accepts the write.
    fn accepts_writes(&self) -> bool {
        self.permissions().can_write()
    }

    /// Store a copy pulled forward by a layered read.
    ///
    /// Returns `Ok(false)` without storing when this repo has not opted in
    /// (it needs both `write` and `read_through_write`). Composite repos pass
    /// the copy only to their own opted-in members.
    fn put_read_through(&self, artifact: &Artifact) -> RepoResult<bool> {
        if !self.permissions().accepts_read_through() {
            return Ok(false);
        }
        self.put(artifact).map(|()| true)
    }

    /// Requires `read`.
    fn get_by_id(&self, id: &ContentId) -> RepoResult<Artifact>;

    /// Some artifact whose value has `value_id`. Requires `read`.
    fn get_by_value_id(&self, value_id: &ContentId) -> RepoResult<Artifact>;

    /// The materialized value of artifact `id`. Requires `read`.
    fn get_value(&self, id: &ContentId) -> RepoResult<Value>;

    /// The provenance inputs of artifact `id`. Requires `read`.
    fn get_inputs(&self, id: &ContentId) -> RepoResult<Inputs>;

    /// Remove an artifact and any blobs it owns. Requires `delete`.
    fn delete(&self, id: &ContentId) -> RepoResult<()>;

    /// Every stored artifact id, sorted. Requires `read`.
    fn artifact_ids(&self) -> RepoResult<Vec<ContentId>>;

    /// Requires `write`.
    fn put_set(&self, set: &ArtifactSet) -> RepoResult<()>;

    /// Set counterpart of [`put_read_through`](Self::put_read_through).
    fn put_set_read_through(&self, set: &ArtifactSet) -> RepoResult<bool> {
        if !self.permissions().accepts_read_through() {
            return Ok(false);
        }
        self.put_set(set).map(|()| true)
    }

    /// Requires `read`.
    fn get_set_by_id(&self, id: &ContentId) -> RepoResult<ArtifactSet>;

    /// The most recently stored set carrying `name`. Requires `read`.
    fn get_set_by_name(&self, name: &str) -> RepoResult<ArtifactSet>;

    /// Requires `read`.
    fn contains_set(&self, id: &ContentId) -> RepoResult<bool>;

    /// Remove a set; its member artifacts are untouched. Requires `delete`.
    fn delete_set(&self, id: &ContentId) -> RepoResult<()>;

    /// Every stored set id, sorted. Requires `read`.
    fn set_ids(&self) -> RepoResult<Vec<ContentId>>;
}
