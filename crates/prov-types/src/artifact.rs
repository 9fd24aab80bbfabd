use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hasher::{Blake3Hasher, IdHasher};
use crate::id::ContentId;
use crate::inputs::{ArtifactProxy, Input, Inputs};

/// An immutable record of a computed value and how it was produced.
///
/// `id` identifies the computation (name, version, inputs); `value_id`
/// identifies the value alone. Two computations yielding the same value share
/// a `value_id` but keep distinct `id`s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ContentId,
    pub value_id: ContentId,
    pub name: String,
    #[serde(default)]
    pub version: u32,
    pub inputs: Inputs,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Value>,
}

impl Artifact {
    /// Start building an artifact for `name` producing `value`.
    pub fn builder(name: impl Into<String>, value: Value) -> ArtifactBuilder {
        ArtifactBuilder::new(name, value)
    }

    /// A by-reference stand-in for use in downstream inputs.
    pub fn proxy(&self) -> ArtifactProxy {
        ArtifactProxy::new(self.id.clone(), self.name.clone())
    }

    /// Ids of the upstream artifacts this one was computed from.
    pub fn input_artifact_ids(&self) -> Vec<ContentId> {
        self.inputs.artifact_ids()
    }

    /// The provenance JSON of this artifact's inputs.
    pub fn inputs_json(&self) -> Value {
        self.inputs.to_json()
    }

    /// Recompute both identifiers with `hasher` and compare.
    pub fn verify_with(&self, hasher: &dyn IdHasher) -> bool {
        hasher.artifact_id(&self.name, self.version, &self.inputs) == self.id
            && hasher.value_id(&self.value) == self.value_id
    }
}

impl From<&Artifact> for Input {
    fn from(artifact: &Artifact) -> Self {
        Input::Artifact(artifact.proxy())
    }
}

/// Builder deriving an artifact's identifiers from its content.
#[derive(Clone, Debug)]
pub struct ArtifactBuilder {
    name: String,
    version: u32,
    inputs: Inputs,
    value: Value,
    computed_at: Option<DateTime<Utc>>,
    custom_fields: BTreeMap<String, Value>,
}

impl ArtifactBuilder {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            version: 0,
            inputs: Inputs::new(),
            value,
            computed_at: None,
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn inputs(mut self, inputs: Inputs) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn computed_at(mut self, at: DateTime<Utc>) -> Self {
        self.computed_at = Some(at);
        self
    }

    pub fn custom_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(key.into(), value.into());
        self
    }

    /// Build with the default BLAKE3 hasher.
    pub fn build(self) -> Artifact {
        self.build_with(&Blake3Hasher)
    }

    pub fn build_with(self, hasher: &dyn IdHasher) -> Artifact {
        Artifact {
            id: hasher.artifact_id(&self.name, self.version, &self.inputs),
            value_id: hasher.value_id(&self.value),
            name: self.name,
            version: self.version,
            inputs: self.inputs,
            value: self.value,
            computed_at: self.computed_at,
            custom_fields: self.custom_fields,
        }
    }
}
