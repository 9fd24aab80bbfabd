//! Declared call signatures for instrumented functions.
//!
//! A [`FunctionSignature`] is built once, when a function is registered, and
//! binds each call's positional and keyword arguments into [`Inputs`] in
//! declared parameter order. Keyword order at the call site therefore never
//! affects the provenance record or the artifact id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::inputs::{Input, Inputs, VARARGS_KEY};

/// A declared parameter, optionally with a literal default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Name, version, and parameter list of an instrumented function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub params: Vec<Param>,
    /// Name of the slot collecting positional extras, if the function has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub varargs: Option<String>,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 0,
            params: Vec::new(),
            varargs: None,
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Declare a required parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Declare a parameter with a literal default.
    pub fn param_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Accept positional extras, recorded under `__varargs`.
    pub fn varargs(mut self, name: impl Into<String>) -> Self {
        self.varargs = Some(name.into());
        self
    }

    /// Check the signature is well formed: non-empty name, unique parameter
    /// names, and no parameter using the reserved varargs key.
    pub fn validate(&self) -> Result<(), TypeError> {
        let invalid = |reason: String| TypeError::InvalidSignature {
            function: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(invalid("function name is empty".into()));
        }
        for (i, param) in self.params.iter().enumerate() {
            if param.name.is_empty() || param.name == VARARGS_KEY {
                return Err(invalid(format!("invalid parameter name `{}`", param.name)));
            }
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(invalid(format!("duplicate parameter `{}`", param.name)));
            }
            if self.varargs.as_deref() == Some(param.name.as_str()) {
                return Err(invalid(format!(
                    "`{}` is both a parameter and the varargs slot",
                    param.name
                )));
            }
        }
        Ok(())
    }

    /// Bind call arguments into provenance inputs.
    ///
    /// Positional arguments fill declared parameters left to right; extras go
    /// to the varargs slot. Keywords bind by name. Unbound parameters take
    /// their default or fail with [`TypeError::MissingArgument`].
    pub fn bind(
        &self,
        positional: Vec<Input>,
        keywords: Vec<(String, Input)>,
    ) -> Result<Inputs, TypeError> {
        self.validate()?;

        let given = positional.len();
        let mut slots: Vec<Option<Input>> = vec![None; self.params.len()];
        let mut positional = positional.into_iter();
        for slot in slots.iter_mut() {
            match positional.next() {
                Some(input) => *slot = Some(input),
                None => break,
            }
        }
        let extras: Vec<Input> = positional.collect();
        if !extras.is_empty() && self.varargs.is_none() {
            return Err(TypeError::TooManyPositional {
                function: self.name.clone(),
                expected: self.params.len(),
                given,
            });
        }

        for (key, input) in keywords {
            let idx = self
                .params
                .iter()
                .position(|p| p.name == key)
                .ok_or_else(|| TypeError::UnknownParameter {
                    function: self.name.clone(),
                    param: key.clone(),
                })?;
            if slots[idx].is_some() {
                return Err(TypeError::DuplicateArgument {
                    function: self.name.clone(),
                    param: key,
                });
            }
            slots[idx] = Some(input);
        }

        let mut inputs = Inputs::new();
        for (param, slot) in self.params.iter().zip(slots) {
            let input = match (slot, &param.default) {
                (Some(input), _) => input,
                (None, Some(default)) => Input::Literal(default.clone()),
                (None, None) => {
                    return Err(TypeError::MissingArgument {
                        function: self.name.clone(),
                        param: param.name.clone(),
                    })
                }
            };
            inputs.insert(param.name.clone(), input)?;
        }
        for extra in extras {
            inputs.push_vararg(extra);
        }
        Ok(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{Blake3Hasher, IdHasher};
    use crate::inputs::ArtifactProxy;
    use proptest::prelude::*;
    use serde_json::json;

    fn combine() -> FunctionSignature {
        FunctionSignature::new("combine_processed_data")
            .param("filename")
            .param("inc_x")
            .param("inc_y")
            .param("timestamp")
    }

    fn kw(name: &str, input: impl Into<Input>) -> (String, Input) {
        (name.to_string(), input.into())
    }

    #[test]
    fn keywords_bind_in_declared_order() {
        let inputs = combine()
            .bind(
                vec![],
                vec![
                    kw("timestamp", "2016-09-27"),
                    kw("inc_y", ArtifactProxy::new("y", "process_data_Y")),
                    kw("filename", "foo-bar"),
                    kw("inc_x", ArtifactProxy::new("x", "process_data_X")),
                ],
            )
            .unwrap();
        let names: Vec<&str> = inputs.kwargs().map(|(k, _)| k).collect();
        assert_eq!(names, ["filename", "inc_x", "inc_y", "timestamp"]);
    }

    #[test]
    fn positional_and_keyword_mix() {
        let inputs = combine()
            .bind(
                vec![Input::from("foo-bar"), ArtifactProxy::new("x", "X").into()],
                vec![kw("timestamp", 1), kw("inc_y", 2)],
            )
            .unwrap();
        assert_eq!(
            inputs.to_json(),
            json!({
                "filename": "foo-bar",
                "inc_x": {"id": "x", "name": "X", "type": "ArtifactProxy"},
                "inc_y": 2,
                "timestamp": 1,
                "__varargs": []
            })
        );
    }

    #[test]
    fn extras_go_to_varargs() {
        let sig = FunctionSignature::new("sum").param("first").varargs("rest");
        let inputs = sig
            .bind(vec![1.into(), 2.into(), 3.into()], vec![])
            .unwrap();
        assert_eq!(inputs.to_json(), json!({"first": 1, "__varargs": [2, 3]}));
    }

    #[test]
    fn extras_without_varargs_slot_fail() {
        let sig = FunctionSignature::new("one").param("a");
        let err = sig.bind(vec![1.into(), 2.into()], vec![]).unwrap_err();
        assert_eq!(
            err,
            TypeError::TooManyPositional {
                function: "one".into(),
                expected: 1,
                given: 2
            }
        );
    }

    #[test]
    fn defaults_fill_missing_parameters() {
        let sig = FunctionSignature::new("f").param("a").param_with_default("b", 10);
        let inputs = sig.bind(vec![1.into()], vec![]).unwrap();
        assert_eq!(inputs.to_json(), json!({"a": 1, "b": 10, "__varargs": []}));
    }

    #[test]
    fn missing_argument_fails() {
        let err = combine().bind(vec![], vec![]).unwrap_err();
        assert!(matches!(err, TypeError::MissingArgument { ref param, .. } if param == "filename"));
    }

    #[test]
    fn unknown_and_duplicate_keywords_fail() {
        let sig = FunctionSignature::new("f").param("a");
        assert!(matches!(
            sig.bind(vec![], vec![kw("b", 1)]),
            Err(TypeError::UnknownParameter { .. })
        ));
        assert!(matches!(
            sig.bind(vec![1.into()], vec![kw("a", 2)]),
            Err(TypeError::DuplicateArgument { .. })
        ));
    }

    #[test]
    fn invalid_signatures_are_rejected() {
        let dup = FunctionSignature::new("f").param("a").param("a");
        assert!(matches!(dup.validate(), Err(TypeError::InvalidSignature { .. })));
        let reserved = FunctionSignature::new("f").param(VARARGS_KEY);
        assert!(reserved.validate().is_err());
        let clash = FunctionSignature::new("f").param("rest").varargs("rest");
        assert!(clash.validate().is_err());
        assert!(FunctionSignature::new("").validate().is_err());
    }

    proptest! {
        #[test]
        fn artifact_id_independent_of_keyword_order(
            values in proptest::collection::vec(any::<i64>(), 4),
            rotation in 0usize..4,
        ) {
            let sig = FunctionSignature::new("f").param("a").param("b").param("c").param("d");
            let names = ["a", "b", "c", "d"];
            let mut keywords: Vec<(String, Input)> = names
                .iter()
                .zip(&values)
                .map(|(n, v)| (n.to_string(), Input::from(*v)))
                .collect();
            let baseline = sig.bind(vec![], keywords.clone()).unwrap();
            keywords.rotate_left(rotation);
            let rotated = sig.bind(vec![], keywords).unwrap();
            prop_assert_eq!(
                Blake3Hasher.artifact_id(&sig.name, sig.version, &baseline),
                Blake3Hasher.artifact_id(&sig.name, sig.version, &rotated)
            );
        }
    }
}
