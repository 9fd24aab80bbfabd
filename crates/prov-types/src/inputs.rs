//! Provenance inputs: the bound call arguments of a computation.
//!
//! [`Inputs`] is the ordered parameter mapping recorded on every artifact.
//! Its JSON form ([`Inputs::to_json`]) is both the persisted provenance record
//! and part of the hash input of the artifact id, so the shape is fixed:
//!
//! ```text
//! { "<param>": <literal> | {"id": .., "name": .., "type": "ArtifactProxy"},
//!   ...,
//!   "__varargs": [ ... ] }
//! ```
//!
//! Upstream artifacts are always recorded as proxies, never by value, which
//! bounds serialization depth to one level.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::id::ContentId;

/// Reserved key holding positional extras.
pub const VARARGS_KEY: &str = "__varargs";

/// Value of the `type` field of a serialized proxy.
pub const PROXY_TYPE: &str = "ArtifactProxy";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum ProxyKind {
    ArtifactProxy,
}

/// By-reference stand-in for an upstream artifact.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactProxy {
    pub id: ContentId,
    pub name: String,
    #[serde(rename = "type")]
    kind: ProxyKind,
}

impl ArtifactProxy {
    pub fn new(id: impl Into<ContentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ProxyKind::ArtifactProxy,
        }
    }

    fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(3);
        map.insert("id".into(), Value::String(self.id.to_string()));
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("type".into(), Value::String(PROXY_TYPE.into()));
        Value::Object(map)
    }

    fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 3 || map.get("type")?.as_str()? != PROXY_TYPE {
            return None;
        }
        let id = map.get("id")?.as_str()?;
        let name = map.get("name")?.as_str()?;
        Some(Self::new(id, name))
    }
}

/// A single bound argument: a literal or a reference to an artifact.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Literal(Value),
    Artifact(ArtifactProxy),
}

impl Input {
    /// The referenced artifact, if this input is one.
    pub fn as_proxy(&self) -> Option<&ArtifactProxy> {
        match self {
            Self::Artifact(proxy) => Some(proxy),
            Self::Literal(_) => None,
        }
    }

    /// The literal value, if this input is one.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Artifact(_) => None,
        }
    }

    /// Serialized form: literals verbatim, artifacts as proxy records.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Artifact(proxy) => proxy.to_json(),
        }
    }

    /// Inverse of [`to_json`](Self::to_json). A JSON object shaped exactly
    /// like a proxy record is read back as an artifact reference.
    pub fn from_json(value: &Value) -> Self {
        match ArtifactProxy::from_json(value) {
            Some(proxy) => Self::Artifact(proxy),
            None => Self::Literal(value.clone()),
        }
    }
}

/// Render a timestamp literal the way inputs record it (RFC 3339, UTC).
pub fn datetime_literal(at: &DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<ArtifactProxy> for Input {
    fn from(proxy: ArtifactProxy) -> Self {
        Self::Artifact(proxy)
    }
}

impl From<DateTime<Utc>> for Input {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Literal(datetime_literal(&at))
    }
}

macro_rules! literal_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Input {
            fn from(value: $ty) -> Self {
                Self::Literal(Value::from(value))
            }
        })*
    };
}

literal_from!(bool, i32, i64, u32, u64, f64, &str, String);

/// Ordered parameter-name -> input mapping plus positional extras.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inputs {
    kwargs: IndexMap<String, Input>,
    varargs: Vec<Input>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `input`, keeping first-insertion order.
    ///
    /// Returns the previous binding, if any. The reserved `__varargs` key is
    /// rejected; use [`push_vararg`](Self::push_vararg).
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        input: impl Into<Input>,
    ) -> Result<Option<Input>, TypeError> {
        let name = name.into();
        if name == VARARGS_KEY {
            return Err(TypeError::InvalidInputs(format!(
                "`{VARARGS_KEY}` is reserved for positional extras"
            )));
        }
        Ok(self.kwargs.insert(name, input.into()))
    }

    /// Append a positional extra.
    pub fn push_vararg(&mut self, input: impl Into<Input>) {
        self.varargs.push(input.into());
    }

    pub fn get(&self, name: &str) -> Option<&Input> {
        self.kwargs.get(name)
    }

    /// Named inputs in stored order.
    pub fn kwargs(&self) -> impl Iterator<Item = (&str, &Input)> {
        self.kwargs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn varargs(&self) -> &[Input] {
        &self.varargs
    }

    /// Number of named inputs (positional extras excluded).
    pub fn len(&self) -> usize {
        self.kwargs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kwargs.is_empty() && self.varargs.is_empty()
    }

    /// Ids of every referenced upstream artifact, first occurrence first.
    pub fn artifact_ids(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = Vec::new();
        let refs = self.kwargs.values().chain(self.varargs.iter());
        for proxy in refs.filter_map(Input::as_proxy) {
            if !ids.contains(&proxy.id) {
                ids.push(proxy.id.clone());
            }
        }
        ids
    }

    /// The provenance JSON structure.
    ///
    /// Named inputs appear in stored order followed by `__varargs`, which is
    /// always present so the shape does not depend on call style.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.kwargs.len() + 1);
        for (name, input) in &self.kwargs {
            map.insert(name.clone(), input.to_json());
        }
        let varargs = self.varargs.iter().map(Input::to_json).collect();
        map.insert(VARARGS_KEY.into(), Value::Array(varargs));
        Value::Object(map)
    }

    /// Parse a provenance JSON structure back into inputs.
    ///
    /// A missing `__varargs` entry is read as empty.
    pub fn from_json(value: &Value) -> Result<Self, TypeError> {
        let map = value
            .as_object()
            .ok_or_else(|| TypeError::InvalidInputs("expected a JSON object".into()))?;
        let mut inputs = Self::new();
        for (name, item) in map {
            if name == VARARGS_KEY {
                let items = item.as_array().ok_or_else(|| {
                    TypeError::InvalidInputs(format!("`{VARARGS_KEY}` must be an array"))
                })?;
                inputs.varargs = items.iter().map(Input::from_json).collect();
            } else {
                inputs.kwargs.insert(name.clone(), Input::from_json(item));
            }
        }
        Ok(inputs)
    }
}

/// Free-function form of [`Inputs::to_json`].
pub fn inputs_json(inputs: &Inputs) -> Value {
    inputs.to_json()
}

impl Serialize for Inputs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Inputs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(D::Error::custom)
    }
}

impl Serialize for Input {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Input {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|v| Self::from_json(&v))
    }
}
