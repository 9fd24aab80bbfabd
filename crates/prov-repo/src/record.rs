use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use prov_store::BlobStore;
use prov_types::{Artifact, ContentId, Inputs};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{RepoError, RepoResult};

/// Where an artifact's value and inputs live.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "storage", rename_all = "snake_case")]
pub enum Payload {
    /// Kept in the record itself.
    Inline { value: Value, inputs: Inputs },
    /// Delegated to the blob store: the value under `value_id`, the inputs
    /// JSON under `id`.
    Blob,
}

/// The metadata a repo indexes for one artifact.
///
/// Records are what the in-memory index holds and what the database journal
/// persists. The bulky parts of the artifact sit behind [`Payload`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: ContentId,
    pub value_id: ContentId,
    pub name: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Value>,
    /// Upstream artifact ids, so lineage queries need not load the inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_artifact_ids: Vec<ContentId>,
    pub payload: Payload,
}

impl ArtifactRecord {
    pub fn is_inline(&self) -> bool {
        matches!(self.payload, Payload::Inline { .. })
    }
}

/// Moves artifact payloads between records and an optional blob store.
#[derive(Clone, Default)]
pub(crate) struct ValueStorage {
    blobs: Option<Arc<dyn BlobStore>>,
}

impl ValueStorage {
    pub fn new(blobs: Option<Arc<dyn BlobStore>>) -> Self {
        Self { blobs }
    }

    pub fn blobstore(&self) -> Option<&Arc<dyn BlobStore>> {
        self.blobs.as_ref()
    }

    /// Build the record for `artifact`, writing its blobs first when a blob
    /// store is attached.
    pub fn store(&self, artifact: &Artifact) -> RepoResult<ArtifactRecord> {
        let payload = match &self.blobs {
            Some(blobs) => {
                blobs.put(&artifact.value_id, &serde_json::to_vec(&artifact.value)?)?;
                blobs.put(&artifact.id, &serde_json::to_vec(&artifact.inputs)?)?;
                Payload::Blob
            }
            None => Payload::Inline {
                value: artifact.value.clone(),
                inputs: artifact.inputs.clone(),
            },
        };
        Ok(ArtifactRecord {
            id: artifact.id.clone(),
            value_id: artifact.value_id.clone(),
            name: artifact.name.clone(),
            version: artifact.version,
            computed_at: artifact.computed_at,
            custom_fields: artifact.custom_fields.clone(),
            input_artifact_ids: artifact.input_artifact_ids(),
            payload,
        })
    }

    pub fn load(&self, record: &ArtifactRecord) -> RepoResult<Artifact> {
        Ok(Artifact {
            id: record.id.clone(),
            value_id: record.value_id.clone(),
            name: record.name.clone(),
            version: record.version,
            inputs: self.load_inputs(record)?,
            value: self.load_value(record)?,
            computed_at: record.computed_at,
            custom_fields: record.custom_fields.clone(),
        })
    }

    pub fn load_value(&self, record: &ArtifactRecord) -> RepoResult<Value> {
        match &record.payload {
            Payload::Inline { value, .. } => Ok(value.clone()),
            Payload::Blob => {
                let bytes = self.blobs_for(record)?.get(&record.value_id)?;
                Ok(serde_json::from_slice(&bytes)?)
            }
        }
    }

    pub fn load_inputs(&self, record: &ArtifactRecord) -> RepoResult<Inputs> {
        match &record.payload {
            Payload::Inline { inputs, .. } => Ok(inputs.clone()),
            Payload::Blob => {
                let bytes = self.blobs_for(record)?.get(&record.id)?;
                Ok(serde_json::from_slice(&bytes)?)
            }
        }
    }

    /// Delete the blobs owned by `record`. The value blob is kept when
    /// another stored artifact still references the same `value_id`.
    /// Fails when `record` has blobs but no store is attached to remove them.
    pub fn ensure_discardable(&self, record: &ArtifactRecord) -> RepoResult<()> {
        if !record.is_inline() {
            self.blobs_for(record)?;
        }
        Ok(())
    }

    /// Delete the blobs `record` owns. Both deletes are attempted; the first
    /// error is returned.
    pub fn discard(&self, record: &ArtifactRecord, value_shared: bool) -> RepoResult<()> {
        if record.is_inline() {
            return Ok(());
        }
        let blobs = self.blobs_for(record)?;
        let inputs = blobs.delete(&record.id);
        let value = if value_shared {
            Ok(false)
        } else {
            blobs.delete(&record.value_id)
        };
        inputs?;
        value?;
        Ok(())
    }

    /// Best-effort cleanup after a put that failed past [`store`](Self::store).
    pub fn rollback(&self, record: &ArtifactRecord, value_shared: bool) {
        if let Err(e) = self.discard(record, value_shared) {
            warn!(id = %record.id.short(), error = %e, "failed to roll back blobs");
        }
    }

    fn blobs_for(&self, record: &ArtifactRecord) -> RepoResult<&Arc<dyn BlobStore>> {
        self.blobs.as_ref().ok_or_else(|| {
            RepoError::Config(format!(
                "artifact {} is stored in a blob store but none is attached",
                record.id
            ))
        })
    }
}

impl std::fmt::Debug for ValueStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStorage")
            .field("blobstore", &self.blobs.is_some())
            .finish()
    }
}
