use indexmap::IndexMap;
use prov_types::Input;
use serde_json::Value;

use crate::error::{SdkError, SdkResult};

/// Arguments of one call, as written at the call site.
///
/// ```
/// use prov_sdk::CallArgs;
///
/// let args = CallArgs::new().arg("data.csv").kwarg("scale", 2);
/// assert_eq!(args.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CallArgs {
    pub(crate) positional: Vec<Input>,
    pub(crate) keywords: Vec<(String, Input)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument. Artifacts are passed by reference
    /// (`&artifact`) and recorded as proxies.
    pub fn arg(mut self, input: impl Into<Input>) -> Self {
        self.positional.push(input.into());
        self
    }

    /// Append a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, input: impl Into<Input>) -> Self {
        self.keywords.push((name.into(), input.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bound arguments with every artifact reference replaced by its value.
///
/// This is what a computation sees: plain JSON values in declared parameter
/// order, plus any positional extras.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundArgs {
    pub(crate) kwargs: IndexMap<String, Value>,
    pub(crate) varargs: Vec<Value>,
}

impl BoundArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }

    /// Like [`get`](Self::get), failing with [`SdkError::MissingArgument`].
    pub fn value(&self, name: &str) -> SdkResult<&Value> {
        self.get(name)
            .ok_or_else(|| SdkError::MissingArgument(name.to_string()))
    }

    pub fn i64(&self, name: &str) -> SdkResult<i64> {
        self.value(name)?
            .as_i64()
            .ok_or_else(|| SdkError::compute(format!("argument `{name}` is not an integer")))
    }

    pub fn str(&self, name: &str) -> SdkResult<&str> {
        self.value(name)?
            .as_str()
            .ok_or_else(|| SdkError::compute(format!("argument `{name}` is not a string")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.kwargs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn varargs(&self) -> &[Value] {
        &self.varargs
    }
}
