use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use prov_types::{ArtifactSet, ContentId};

use crate::journal::JournalOp;
use crate::record::ArtifactRecord;

/// In-memory lookup tables shared by the memory and database repos.
///
/// Maintains three views that must stay consistent:
/// - `artifacts`: id to record, in insertion order
/// - `by_value`: value id to every artifact id carrying that value
/// - `sets` and `names`: set id to set, and set name to every set id that
///   carried it, oldest first
///
/// No permission checks happen here; callers gate access.
#[derive(Debug, Default)]
pub(crate) struct RepoIndex {
    artifacts: IndexMap<ContentId, ArtifactRecord>,
    by_value: HashMap<ContentId, BTreeSet<ContentId>>,
    sets: IndexMap<ContentId, ArtifactSet>,
    names: HashMap<String, Vec<ContentId>>,
}

impl RepoIndex {
    pub fn contains(&self, id: &ContentId) -> bool {
        self.artifacts.contains_key(id)
    }

    pub fn get(&self, id: &ContentId) -> Option<&ArtifactRecord> {
        self.artifacts.get(id)
    }

    /// The record with the smallest id among those carrying `value_id`.
    pub fn first_by_value(&self, value_id: &ContentId) -> Option<&ArtifactRecord> {
        self.by_value
            .get(value_id)
            .and_then(|ids| ids.iter().next())
            .and_then(|id| self.artifacts.get(id))
    }

    /// How many stored artifacts carry `value_id`.
    pub fn value_refs(&self, value_id: &ContentId) -> usize {
        self.by_value.get(value_id).map_or(0, BTreeSet::len)
    }

    pub fn insert(&mut self, record: ArtifactRecord) {
        self.by_value
            .entry(record.value_id.clone())
            .or_default()
            .insert(record.id.clone());
        self.artifacts.insert(record.id.clone(), record);
    }

    pub fn remove(&mut self, id: &ContentId) -> Option<ArtifactRecord> {
        let record = self.artifacts.shift_remove(id)?;
        if let Some(ids) = self.by_value.get_mut(&record.value_id) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_value.remove(&record.value_id);
            }
        }
        Some(record)
    }

    pub fn records(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.artifacts.values()
    }

    pub fn artifact_ids(&self) -> Vec<ContentId> {
        let mut ids: Vec<_> = self.artifacts.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    // ---- sets ----

    pub fn contains_set(&self, id: &ContentId) -> bool {
        self.sets.contains_key(id)
    }

    pub fn get_set(&self, id: &ContentId) -> Option<&ArtifactSet> {
        self.sets.get(id)
    }

    /// The most recently inserted set still carrying `name`.
    pub fn set_by_name(&self, name: &str) -> Option<&ArtifactSet> {
        self.names
            .get(name)
            .and_then(|ids| ids.last())
            .and_then(|id| self.sets.get(id))
    }

    pub fn insert_set(&mut self, set: ArtifactSet) {
        if let Some(name) = &set.name {
            self.names.entry(name.clone()).or_default().push(set.id.clone());
        }
        self.sets.insert(set.id.clone(), set);
    }

    pub fn remove_set(&mut self, id: &ContentId) -> Option<ArtifactSet> {
        let set = self.sets.shift_remove(id)?;
        if let Some(name) = &set.name {
            if let Some(ids) = self.names.get_mut(name) {
                ids.retain(|other| other != id);
                if ids.is_empty() {
                    self.names.remove(name);
                }
            }
        }
        Some(set)
    }

    pub fn sets(&self) -> impl Iterator<Item = &ArtifactSet> {
        self.sets.values()
    }

    pub fn set_ids(&self) -> Vec<ContentId> {
        let mut ids: Vec<_> = self.sets.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Apply one journaled mutation.
    pub fn apply(&mut self, op: JournalOp) {
        match op {
            JournalOp::PutArtifact { record } => {
                self.remove(&record.id);
                self.insert(record);
            }
            JournalOp::DeleteArtifact { id } => {
                self.remove(&id);
            }
            JournalOp::PutSet { set } => {
                self.remove_set(&set.id);
                self.insert_set(set);
            }
            JournalOp::DeleteSet { id } => {
                self.remove_set(&id);
            }
        }
    }

    /// The minimal op sequence that rebuilds this index from scratch.
    pub fn snapshot_ops(&self) -> Vec<JournalOp> {
        self.records()
            .cloned()
            .map(|record| JournalOp::PutArtifact { record })
            .chain(self.sets().cloned().map(|set| JournalOp::PutSet { set }))
            .collect()
    }
}
