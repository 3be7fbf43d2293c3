//! The per-run variable space.
//!
//! Every task or process run owns one flat, string-keyed map of JSON
//! values. Seeding fills it from the template's declared inputs (actuals
//! first, declared defaults second); calls read from it through input
//! bindings and write back through output bindings; the run's declared
//! outputs are extracted from it at the end.

use serde_json::{Map, Value};
use taskloom_types::template::{BindingSource, InputBinding, OutputBinding, ParamSpec};

use crate::error::EngineError;

/// A run's mutable variable space.
#[derive(Debug, Default, Clone)]
pub struct VariableSpace {
    vars: Map<String, Value>,
}

impl VariableSpace {
    /// Seed a space from declared inputs and the caller's actual values.
    ///
    /// Every declared input must end up with a value, from the actuals
    /// or from its default; actuals are type-checked against the
    /// declaration. Actual keys that no declaration mentions are a
    /// contract violation.
    pub fn seed(
        declared: Option<&[ParamSpec]>,
        actuals: &Map<String, Value>,
    ) -> Result<Self, EngineError> {
        let declared = declared.unwrap_or(&[]);
        let mut problems = Vec::new();
        let mut vars = Map::new();

        for spec in declared {
            match actuals.get(&spec.name) {
                Some(value) => match spec.ty.check(&spec.name, value) {
                    Ok(()) => {
                        vars.insert(spec.name.clone(), value.clone());
                    }
                    Err(err) => problems.push(err.to_string()),
                },
                None => match &spec.default {
                    Some(default) => {
                        vars.insert(spec.name.clone(), default.clone());
                    }
                    None => problems.push(format!(
                        "required input '{}' was not supplied",
                        spec.name
                    )),
                },
            }
        }

        for key in actuals.keys() {
            if !declared.iter().any(|spec| spec.name == *key) {
                problems.push(format!("input '{key}' is not declared"));
            }
        }

        if problems.is_empty() {
            Ok(Self { vars })
        } else {
            Err(EngineError::Parameter(problems.join("; ")))
        }
    }

    /// Read one variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Write one variable, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// The whole space, for expression-evaluation contexts.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.vars
    }

    /// Resolve a call's input bindings into the callee's actual inputs.
    ///
    /// Literals are taken as written; `source` bindings are read from
    /// this space. Every resolved value is checked against the binding's
    /// declared type.
    pub fn resolve_inputs(
        &self,
        bindings: &[InputBinding],
    ) -> Result<Map<String, Value>, EngineError> {
        let mut resolved = Map::new();
        for binding in bindings {
            let value = match &binding.source {
                BindingSource::Literal(value) => value.clone(),
                BindingSource::Variable(source) => self
                    .get(source)
                    .cloned()
                    .ok_or_else(|| {
                        EngineError::Parameter(format!(
                            "input '{}' reads missing variable '{source}'",
                            binding.name
                        ))
                    })?,
            };
            binding.ty.check(&binding.name, &value)?;
            resolved.insert(binding.name.clone(), value);
        }
        Ok(resolved)
    }

    /// Bind a callee's outputs into this space, all or nothing.
    ///
    /// Every binding is checked (key present, type matches) before any
    /// target is written, so a failing call leaves the space untouched.
    pub fn bind_outputs(
        &mut self,
        bindings: &[OutputBinding],
        outputs: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        let mut staged = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let value = outputs.get(&binding.name).ok_or_else(|| {
                EngineError::Parameter(format!(
                    "callee produced no output '{}' for target '{}'",
                    binding.name, binding.target
                ))
            })?;
            binding.ty.check(&binding.name, value)?;
            staged.push((binding.target.clone(), value.clone()));
        }
        for (target, value) in staged {
            self.vars.insert(target, value);
        }
        Ok(())
    }

    /// Extract the run's declared outputs from the space.
    ///
    /// Every declared output must be present and well-typed; a missing
    /// one means the execution graph never produced it.
    pub fn extract_outputs(
        &self,
        declared: Option<&[ParamSpec]>,
    ) -> Result<Map<String, Value>, EngineError> {
        let mut outputs = Map::new();
        for spec in declared.unwrap_or(&[]) {
            let value = self.get(&spec.name).ok_or_else(|| {
                EngineError::Parameter(format!(
                    "declared output '{}' was never produced",
                    spec.name
                ))
            })?;
            spec.ty.check(&spec.name, value)?;
            outputs.insert(spec.name.clone(), value.clone());
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskloom_types::param::ParamType;
    use taskloom_types::template::BindingSource;

    fn spec(name: &str, ty: ParamType, default: Option<Value>) -> ParamSpec {
        ParamSpec {
            name: name.to_string(),
            description: "d".to_string(),
            ty,
            default,
        }
    }

    fn actuals(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn seed_prefers_actuals_over_defaults() {
        let declared = [
            spec("city", ParamType::String, Some(json!("beijing"))),
            spec("days", ParamType::Number, Some(json!(3))),
        ];
        let space =
            VariableSpace::seed(Some(declared.as_slice()), &actuals(&[("city", json!("tokyo"))])).unwrap();
        assert_eq!(space.get("city"), Some(&json!("tokyo")));
        assert_eq!(space.get("days"), Some(&json!(3)));
    }

    #[test]
    fn seed_collects_missing_and_mistyped_and_undeclared() {
        let declared = [
            spec("city", ParamType::String, None),
            spec("days", ParamType::Number, None),
        ];
        let err = VariableSpace::seed(
            Some(declared.as_slice()),
            &actuals(&[("days", json!("three")), ("mood", json!("sunny"))]),
        )
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("'city'"), "missing input: {text}");
        assert!(text.contains("'days'"), "mistyped input: {text}");
        assert!(text.contains("'mood'"), "undeclared input: {text}");
    }

    #[test]
    fn resolve_inputs_reads_literals_and_variables() {
        let mut space = VariableSpace::default();
        space.insert("question", json!("weather tomorrow?"));
        let bindings = [
            InputBinding {
                name: "q".to_string(),
                ty: ParamType::String,
                source: BindingSource::Variable("question".to_string()),
            },
            InputBinding {
                name: "lang".to_string(),
                ty: ParamType::String,
                source: BindingSource::Literal(json!("en")),
            },
        ];
        let resolved = space.resolve_inputs(&bindings).unwrap();
        assert_eq!(resolved["q"], json!("weather tomorrow?"));
        assert_eq!(resolved["lang"], json!("en"));
    }

    #[test]
    fn resolve_inputs_fails_on_missing_variable() {
        let space = VariableSpace::default();
        let bindings = [InputBinding {
            name: "q".to_string(),
            ty: ParamType::String,
            source: BindingSource::Variable("question".to_string()),
        }];
        let err = space.resolve_inputs(&bindings).unwrap_err();
        assert!(matches!(err, EngineError::Parameter(_)));
        assert!(err.to_string().contains("'question'"));
    }

    #[test]
    fn bind_outputs_is_all_or_nothing() {
        let mut space = VariableSpace::default();
        space.insert("kept", json!("before"));
        let bindings = [
            OutputBinding {
                name: "a".to_string(),
                ty: ParamType::String,
                target: "kept".to_string(),
            },
            OutputBinding {
                name: "b".to_string(),
                ty: ParamType::String,
                target: "other".to_string(),
            },
        ];
        // "b" is absent, so the well-formed "a" must not be written.
        let outputs = actuals(&[("a", json!("after"))]);
        let err = space.bind_outputs(&bindings, &outputs).unwrap_err();
        assert!(err.to_string().contains("'b'"));
        assert_eq!(space.get("kept"), Some(&json!("before")));
        assert!(space.get("other").is_none());
    }

    #[test]
    fn extract_outputs_requires_every_declared_output() {
        let mut space = VariableSpace::default();
        space.insert("answer", json!("42"));
        let declared = [
            spec("answer", ParamType::String, None),
            spec("confidence", ParamType::Number, None),
        ];
        let err = space.extract_outputs(Some(declared.as_slice())).unwrap_err();
        assert!(err.to_string().contains("'confidence'"));

        space.insert("confidence", json!(0.9));
        let outputs = space.extract_outputs(Some(declared.as_slice())).unwrap();
        assert_eq!(outputs.len(), 2);
    }

    #[test]
    fn no_declared_params_yield_empty_results() {
        let space = VariableSpace::seed(None, &Map::new()).unwrap();
        assert!(space.as_map().is_empty());
        assert!(space.extract_outputs(None).unwrap().is_empty());
    }
}
