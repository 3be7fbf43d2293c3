//! Call-spec validation: `class`/`id`, input and output bindings, and
//! the optional `error_handling` policy.

use serde_json::Value;
use taskloom_types::param::ParamType;
use taskloom_types::template::{
    BindingSource, CallKind, CallSpec, ErrorPolicy, ErrorStrategy, InputBinding, OutputBinding,
    RetryPolicy,
};

use super::{require_param_type, require_string};

/// Bounds on the retry policy. A `retry_count` of zero is expressed by
/// disabling retries, not by a zero count.
const RETRY_COUNT_RANGE: std::ops::RangeInclusive<u64> = 1..=15;
const RETRY_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 0..=1000;

/// Validate one `{class, id, inputs, outputs, error_handling?}` call.
pub fn validate_call(doc: &Value) -> Result<CallSpec, Vec<String>> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec!["'call' must be an object".to_string()]);
    };

    let kind = match obj.get("class") {
        Some(Value::String(s)) => match CallKind::parse(s) {
            Some(kind) => Some(kind),
            None => {
                errors.push(format!(
                    "'class' '{s}' is not callable (expected one of action, generator, process, tool)"
                ));
                None
            }
        },
        Some(_) => {
            errors.push("'class' must be a string".to_string());
            None
        }
        None => {
            errors.push("'class' is required".to_string());
            None
        }
    };

    let id = require_string(obj, "id", &mut errors);

    let inputs = validate_bindings(obj, "inputs", &mut errors, validate_input_binding);
    let outputs = validate_bindings(obj, "outputs", &mut errors, validate_output_binding);

    let error_handling = match obj.get("error_handling") {
        Some(policy_doc) => match validate_error_policy(policy_doc) {
            Ok(policy) => policy,
            Err(sub) => {
                errors.extend(sub.into_iter().map(|e| format!("'error_handling': {e}")));
                ErrorPolicy::default()
            }
        },
        None => ErrorPolicy::default(),
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CallSpec {
        kind: kind.unwrap_or(CallKind::Tool),
        id: id.unwrap_or_default(),
        inputs,
        outputs,
        error_handling,
    })
}

/// Validate a binding list under `key`. The key is required; null means
/// no bindings.
fn validate_bindings<T>(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
    validate_one: fn(&Value) -> Result<T, Vec<String>>,
) -> Vec<T> {
    let Some(value) = obj.get(key) else {
        errors.push(format!("'call' must contain '{key}'"));
        return Vec::new();
    };

    let items = match value {
        Value::Null => return Vec::new(),
        Value::Array(items) => items,
        _ => {
            errors.push(format!("'{key}' must be a list or null"));
            return Vec::new();
        }
    };

    let mut bindings = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match validate_one(item) {
            Ok(binding) => bindings.push(binding),
            Err(sub) => errors.extend(
                sub.into_iter()
                    .map(|e| format!("'{key}' entry {}: {e}", idx + 1)),
            ),
        }
    }
    bindings
}

/// Validate one input binding: `name`, `type`, and exactly one of
/// `value`/`source`. A literal `value` is type-checked immediately;
/// a `source` lookup can only be checked at run time.
fn validate_input_binding(doc: &Value) -> Result<InputBinding, Vec<String>> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec!["each input binding must be an object".to_string()]);
    };

    let name = require_string(obj, "name", &mut errors);
    let ty = require_param_type(obj, name.as_deref(), &mut errors);

    let source = match (obj.get("value"), obj.get("source")) {
        (Some(_), Some(_)) => {
            errors.push(format!(
                "input '{}' has both 'value' and 'source'; exactly one is allowed",
                name.as_deref().unwrap_or("<unknown>")
            ));
            None
        }
        (Some(literal), None) => {
            if let Some(ty) = ty {
                let param = name.as_deref().unwrap_or("<unknown>");
                if let Err(err) = ty.check(param, literal) {
                    errors.push(format!("literal 'value' does not match 'type': {err}"));
                }
            }
            Some(BindingSource::Literal(literal.clone()))
        }
        (None, Some(Value::String(var))) => Some(BindingSource::Variable(var.clone())),
        (None, Some(_)) => {
            errors.push(format!(
                "input '{}' has a non-string 'source'",
                name.as_deref().unwrap_or("<unknown>")
            ));
            None
        }
        (None, None) => {
            errors.push(format!(
                "input '{}' needs either 'value' or 'source'",
                name.as_deref().unwrap_or("<unknown>")
            ));
            None
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(InputBinding {
        name: name.unwrap_or_default(),
        ty: ty.unwrap_or(ParamType::String),
        source: source.unwrap_or(BindingSource::Literal(Value::Null)),
    })
}

/// Validate one output binding: `name`, `type`, `target`.
fn validate_output_binding(doc: &Value) -> Result<OutputBinding, Vec<String>> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec!["each output binding must be an object".to_string()]);
    };

    let name = require_string(obj, "name", &mut errors);
    let ty = require_param_type(obj, name.as_deref(), &mut errors);
    let target = require_string(obj, "target", &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(OutputBinding {
        name: name.unwrap_or_default(),
        ty: ty.unwrap_or(ParamType::String),
        target: target.unwrap_or_default(),
    })
}

/// Validate `error_handling`: `strategy` and a bounds-checked `retry`.
fn validate_error_policy(doc: &Value) -> Result<ErrorPolicy, Vec<String>> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec!["must be an object".to_string()]);
    };

    let strategy = match obj.get("strategy") {
        Some(Value::String(s)) => match s.as_str() {
            "skip" => Some(ErrorStrategy::Skip),
            "abort" => Some(ErrorStrategy::Abort),
            other => {
                errors.push(format!(
                    "'strategy' '{other}' is invalid (expected 'skip' or 'abort')"
                ));
                None
            }
        },
        Some(_) => {
            errors.push("'strategy' must be a string".to_string());
            None
        }
        None => {
            errors.push("'strategy' is required".to_string());
            None
        }
    };

    let retry = match obj.get("retry") {
        Some(retry_doc) => match validate_retry(retry_doc) {
            Ok(retry) => Some(retry),
            Err(sub) => {
                errors.extend(sub.into_iter().map(|e| format!("'retry': {e}")));
                None
            }
        },
        None => {
            errors.push("'retry' is required".to_string());
            None
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ErrorPolicy {
        strategy: strategy.unwrap_or(ErrorStrategy::Abort),
        retry: retry.unwrap_or_default(),
    })
}

fn validate_retry(doc: &Value) -> Result<RetryPolicy, Vec<String>> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec!["must be an object".to_string()]);
    };

    let enabled = match obj.get("enabled") {
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            errors.push("'enabled' must be a boolean".to_string());
            None
        }
        None => {
            errors.push("'enabled' is required".to_string());
            None
        }
    };

    let retry_count = bounded_u64(obj, "retry_count", RETRY_COUNT_RANGE, 1, &mut errors);
    let interval = bounded_u64(obj, "interval", RETRY_INTERVAL_RANGE, 1, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(RetryPolicy {
        enabled: enabled.unwrap_or(false),
        retry_count: retry_count as u32,
        interval,
    })
}

/// An optional non-negative integer field, bounds-checked when present.
fn bounded_u64(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    range: std::ops::RangeInclusive<u64>,
    default: u64,
    errors: &mut Vec<String>,
) -> u64 {
    match obj.get(key) {
        Some(value) => match value.as_u64() {
            Some(n) if range.contains(&n) => n,
            Some(n) => {
                errors.push(format!(
                    "'{key}' is {n}, outside {}..={}",
                    range.start(),
                    range.end()
                ));
                default
            }
            None => {
                errors.push(format!("'{key}' must be a non-negative integer"));
                default
            }
        },
        None => default,
    }
}
