//! Template validation.
//!
//! Pure recursive descent over a raw JSON document, producing the typed
//! model in `taskloom-types::template`. Validation never fails fast:
//! every sub-validator collects its own error list and callers aggregate
//! with a prefix naming the failing field, step, case, or branch, so one
//! validation pass surfaces every structural defect a template has.
//!
//! Validators return `Result<T, Vec<String>>` internally; only the
//! top-level entry point wraps the collected list in
//! [`EngineError::Template`].

mod call;
mod condition;
mod process;

pub use call::validate_call;
pub use condition::validate_condition;

use serde_json::Value;
use taskloom_types::param::ParamType;
use taskloom_types::template::{ExecKind, ExecutionSpec, ParamSpec, Template};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Validate a raw template document against the schema for `kind`.
///
/// Returns the normalized, typed template, or a [`EngineError::Template`]
/// carrying every violation found. Re-validating the JSON serialization
/// of a validated template is idempotent.
pub fn validate_template(kind: ExecKind, doc: &Value) -> Result<Template, EngineError> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        if doc.is_null() {
            return Err(EngineError::Template(vec![
                "template must not be empty".to_string(),
            ]));
        }
        return Err(EngineError::Template(vec![
            "template must be a JSON object".to_string(),
        ]));
    };

    let name = require_string(obj, "name", &mut errors);
    let description = require_string(obj, "description", &mut errors);
    let inputs = validate_param_specs(obj, "inputs", &mut errors);
    let outputs = validate_param_specs(obj, "outputs", &mut errors);

    let execution = match kind {
        ExecKind::Task | ExecKind::Process => match obj.get("execution") {
            Some(execution_doc) => match validate_execution(kind, execution_doc) {
                Ok(spec) => Some(spec),
                Err(sub) => {
                    errors.extend(sub.into_iter().map(|e| format!("'execution': {e}")));
                    None
                }
            },
            None => {
                errors.push(format!("'{kind}' template must contain 'execution'"));
                None
            }
        },
        // Leaf executables carry a parameter contract only.
        ExecKind::Action | ExecKind::Generator | ExecKind::Tool => None,
    };

    if !errors.is_empty() {
        return Err(EngineError::Template(errors));
    }

    Ok(Template {
        name: name.unwrap_or_default(),
        description: description.unwrap_or_default(),
        inputs,
        outputs,
        execution,
    })
}

/// Dispatch `execution` validation by the enclosing template kind.
fn validate_execution(kind: ExecKind, doc: &Value) -> Result<ExecutionSpec, Vec<String>> {
    match kind {
        ExecKind::Task => process::validate_task_execution(doc),
        ExecKind::Process => process::validate_process_execution(doc),
        _ => Err(vec![format!("'{kind}' templates have no execution graph")]),
    }
}

// ---------------------------------------------------------------------------
// Parameter specs
// ---------------------------------------------------------------------------

/// Validate `inputs` or `outputs`: the key is required; the value may be
/// null (no parameters) or a list of parameter specs.
fn validate_param_specs(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<Vec<ParamSpec>> {
    let Some(value) = obj.get(key) else {
        errors.push(format!("template must contain '{key}'"));
        return None;
    };

    let items = match value {
        Value::Null => return None,
        Value::Array(items) => items,
        _ => {
            errors.push(format!("'{key}' must be a list or null"));
            return None;
        }
    };

    let mut specs = Vec::with_capacity(items.len());
    let mut seen = std::collections::HashSet::new();
    for (idx, item) in items.iter().enumerate() {
        match validate_param_spec(item) {
            Ok(spec) => {
                if !seen.insert(spec.name.clone()) {
                    errors.push(format!("'{key}' has a duplicate parameter '{}'", spec.name));
                }
                specs.push(spec);
            }
            Err(sub) => {
                errors.extend(
                    sub.into_iter()
                        .map(|e| format!("'{key}' entry {}: {e}", idx + 1)),
                );
            }
        }
    }

    if errors.is_empty() { Some(specs) } else { None }
}

/// Validate one `{name, description, type, default?}` parameter spec.
fn validate_param_spec(doc: &Value) -> Result<ParamSpec, Vec<String>> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec!["each parameter must be an object".to_string()]);
    };

    let name = require_string(obj, "name", &mut errors);
    let description = require_string(obj, "description", &mut errors);
    let ty = require_param_type(obj, name.as_deref(), &mut errors);

    let default = obj.get("default").cloned();
    if let (Some(ty), Some(default_value)) = (ty, default.as_ref()) {
        let param = name.as_deref().unwrap_or("<unknown>");
        if let Err(err) = ty.check(param, default_value) {
            errors.push(format!("'default' does not match 'type': {err}"));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ParamSpec {
        name: name.unwrap_or_default(),
        description: description.unwrap_or_default(),
        ty: ty.unwrap_or(ParamType::String),
        default,
    })
}

// ---------------------------------------------------------------------------
// Shared field helpers
// ---------------------------------------------------------------------------

/// Require `key` to be a string field; record an error otherwise.
pub(crate) fn require_string(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(format!("'{key}' must be a string"));
            None
        }
        None => {
            errors.push(format!("'{key}' is required"));
            None
        }
    }
}

/// Require `type` to name one of the six parameter types.
pub(crate) fn require_param_type(
    obj: &serde_json::Map<String, Value>,
    param_name: Option<&str>,
    errors: &mut Vec<String>,
) -> Option<ParamType> {
    let param = param_name.unwrap_or("<unknown>");
    match obj.get("type") {
        Some(Value::String(s)) => match ParamType::parse(s) {
            Some(ty) => Some(ty),
            None => {
                errors.push(format!(
                    "'{param}' has invalid 'type' '{s}' (expected one of {})",
                    ParamType::NAMES.join(", ")
                ));
                None
            }
        },
        Some(_) => {
            errors.push(format!("'{param}' has a non-string 'type'"));
            None
        }
        None => {
            errors.push(format!("'{param}' is missing 'type'"));
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_doc() -> Value {
        json!({
            "name": "weather plan",
            "description": "answer a scheduling question",
            "inputs": [
                {"name": "question", "description": "the user question", "type": "string"}
            ],
            "outputs": [
                {"name": "answer", "description": "the reply", "type": "string"}
            ],
            "execution": {
                "call": {
                    "class": "process",
                    "id": "process_planning0001",
                    "inputs": [
                        {"name": "question", "type": "string", "source": "question"}
                    ],
                    "outputs": [
                        {"name": "answer", "type": "string", "target": "answer"}
                    ]
                }
            }
        })
    }

    #[test]
    fn valid_task_template_passes() {
        let template = validate_template(ExecKind::Task, &task_doc()).expect("valid");
        assert_eq!(template.name, "weather plan");
        assert_eq!(template.inputs.as_ref().unwrap().len(), 1);
        assert!(matches!(
            template.execution,
            Some(ExecutionSpec::Call { .. })
        ));
    }

    #[test]
    fn validation_is_idempotent() {
        let first = validate_template(ExecKind::Task, &task_doc()).expect("valid");
        let reserialized = serde_json::to_value(&first).unwrap();
        let second = validate_template(ExecKind::Task, &reserialized).expect("still valid");
        assert_eq!(
            serde_json::to_value(&second).unwrap(),
            serde_json::to_value(&first).unwrap()
        );
    }

    #[test]
    fn null_inputs_and_outputs_are_allowed() {
        let doc = json!({
            "name": "n",
            "description": "d",
            "inputs": null,
            "outputs": null,
            "execution": {"call": {
                "class": "tool",
                "id": "local.local_time",
                "inputs": [],
                "outputs": []
            }}
        });
        let template = validate_template(ExecKind::Task, &doc).expect("valid");
        assert!(template.inputs.is_none());
        assert!(template.outputs.is_none());
    }

    #[test]
    fn collects_multiple_independent_defects_in_one_pass() {
        // Three defects: missing description, invalid parameter type, and
        // a sequence step whose order mismatches its position.
        let doc = json!({
            "name": "broken",
            "inputs": [
                {"name": "x", "description": "d", "type": "integer"}
            ],
            "outputs": null,
            "execution": {
                "type": "sequence",
                "steps": [
                    {"order": 1, "description": "ok", "call": {
                        "class": "tool", "id": "t", "inputs": [], "outputs": []
                    }},
                    {"order": 3, "description": "bad order", "call": {
                        "class": "tool", "id": "t", "inputs": [], "outputs": []
                    }}
                ]
            }
        });
        let err = validate_template(ExecKind::Process, &doc).unwrap_err();
        let issues = err.template_issues().unwrap();
        assert!(issues.len() >= 3, "expected >=3 issues, got {issues:?}");
        assert!(issues.iter().any(|e| e.contains("'description'")));
        assert!(issues.iter().any(|e| e.contains("'type'")));
        assert!(issues.iter().any(|e| e.contains("order")));
    }

    #[test]
    fn leaf_template_needs_no_execution() {
        let doc = json!({
            "name": "weather api",
            "description": "remote weather lookup",
            "inputs": [
                {"name": "city", "description": "city name", "type": "string"}
            ],
            "outputs": [
                {"name": "weather_result", "description": "raw payload", "type": "string"}
            ]
        });
        let template = validate_template(ExecKind::Action, &doc).expect("valid leaf");
        assert!(template.execution.is_none());
    }

    #[test]
    fn missing_execution_fails_schedulers_only() {
        let doc = json!({
            "name": "n", "description": "d", "inputs": null, "outputs": null
        });
        let err = validate_template(ExecKind::Task, &doc).unwrap_err();
        assert!(err.to_string().contains("'execution'"));
        assert!(validate_template(ExecKind::Generator, &doc).is_ok());
    }

    #[test]
    fn default_must_match_declared_type() {
        let doc = json!({
            "name": "n",
            "description": "d",
            "inputs": [
                {"name": "count", "description": "d", "type": "number", "default": "three"}
            ],
            "outputs": null
        });
        let err = validate_template(ExecKind::Action, &doc).unwrap_err();
        assert!(err.to_string().contains("'default'"), "got: {err}");
    }

    #[test]
    fn duplicate_parameter_names_rejected() {
        let doc = json!({
            "name": "n",
            "description": "d",
            "inputs": [
                {"name": "q", "description": "d", "type": "string"},
                {"name": "q", "description": "d", "type": "string"}
            ],
            "outputs": null
        });
        let err = validate_template(ExecKind::Action, &doc).unwrap_err();
        assert!(err.to_string().contains("duplicate parameter 'q'"));
    }

    #[test]
    fn non_object_template_rejected() {
        let err = validate_template(ExecKind::Task, &json!("nope")).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
        let err = validate_template(ExecKind::Task, &Value::Null).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }
}
