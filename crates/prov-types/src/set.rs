use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hasher::{Blake3Hasher, IdHasher};
use crate::id::ContentId;

/// A named or anonymous grouping of artifact ids.
///
/// The id is derived from the member ids and the name, so every
/// transformation below yields a new set with a new id. Sets reference
/// artifacts; they never own them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
    pub id: ContentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub artifact_ids: BTreeSet<ContentId>,
}

impl ArtifactSet {
    /// An anonymous set.
    pub fn new<I, T>(artifact_ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ContentId>,
    {
        Self::build(collect_ids(artifact_ids), None, &Blake3Hasher)
    }

    /// A named set.
    pub fn named<I, T>(artifact_ids: I, name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ContentId>,
    {
        Self::build(collect_ids(artifact_ids), Some(name.into()), &Blake3Hasher)
    }

    /// Construct with an explicit hasher.
    pub fn build(
        artifact_ids: BTreeSet<ContentId>,
        name: Option<String>,
        hasher: &dyn IdHasher,
    ) -> Self {
        let id = hasher.set_id(&artifact_ids, name.as_deref());
        Self {
            id,
            name,
            artifact_ids,
        }
    }

    fn derive(&self, artifact_ids: BTreeSet<ContentId>, name: Option<String>) -> Self {
        Self::build(artifact_ids, name, &Blake3Hasher)
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.artifact_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.artifact_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifact_ids.is_empty()
    }

    pub fn with_artifact(&self, id: impl Into<ContentId>) -> Self {
        let mut ids = self.artifact_ids.clone();
        ids.insert(id.into());
        self.derive(ids, self.name.clone())
    }

    pub fn without_artifact(&self, id: &ContentId) -> Self {
        let mut ids = self.artifact_ids.clone();
        ids.remove(id);
        self.derive(ids, self.name.clone())
    }

    pub fn union(&self, other: &ArtifactSet, name: Option<String>) -> Self {
        let ids = self.artifact_ids.union(&other.artifact_ids).cloned().collect();
        self.derive(ids, name)
    }

    pub fn difference(&self, other: &ArtifactSet, name: Option<String>) -> Self {
        let ids = self
            .artifact_ids
            .difference(&other.artifact_ids)
            .cloned()
            .collect();
        self.derive(ids, name)
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        self.derive(self.artifact_ids.clone(), Some(name.into()))
    }
}

fn collect_ids<I, T>(ids: I) -> BTreeSet<ContentId>
where
    I: IntoIterator<Item = T>,
    T: Into<ContentId>,
{
    ids.into_iter().map(Into::into).collect()
}
