//! Structured condition-tree validation.
//!
//! A node is either a logical combinator (`type`: and/or over
//! `conditions`) or a single comparison (`operation`, `left`, `right`).

use serde_json::Value;
use taskloom_types::template::{CompareOp, ConditionTree, LogicalOp, Operand, OperandKind};

/// Validate one condition node, recursing into logical combinators.
pub fn validate_condition(doc: &Value) -> Result<ConditionTree, Vec<String>> {
    let Some(obj) = doc.as_object() else {
        return Err(vec!["condition must be an object".to_string()]);
    };

    if obj.contains_key("type") {
        validate_logical(obj)
    } else if obj.contains_key("operation") {
        validate_compare(obj)
    } else {
        Err(vec![
            "condition needs 'type' (and/or) or 'operation'".to_string(),
        ])
    }
}

fn validate_logical(obj: &serde_json::Map<String, Value>) -> Result<ConditionTree, Vec<String>> {
    let mut errors = Vec::new();

    let op = match obj.get("type") {
        Some(Value::String(s)) => match s.as_str() {
            "and" => Some(LogicalOp::And),
            "or" => Some(LogicalOp::Or),
            other => {
                errors.push(format!("'type' '{other}' is invalid (expected 'and' or 'or')"));
                None
            }
        },
        _ => {
            errors.push("'type' must be a string".to_string());
            None
        }
    };

    let mut conditions = Vec::new();
    match obj.get("conditions") {
        Some(Value::Array(items)) => {
            if items.is_empty() {
                errors.push("'conditions' must not be empty".to_string());
            }
            for (idx, item) in items.iter().enumerate() {
                match validate_condition(item) {
                    Ok(tree) => conditions.push(tree),
                    Err(sub) => errors.extend(
                        sub.into_iter()
                            .map(|e| format!("'conditions' entry {}: {e}", idx + 1)),
                    ),
                }
            }
        }
        Some(_) => errors.push("'conditions' must be a list".to_string()),
        None => errors.push("'conditions' is required".to_string()),
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ConditionTree::Logical {
        op: op.unwrap_or(LogicalOp::And),
        conditions,
    })
}

fn validate_compare(obj: &serde_json::Map<String, Value>) -> Result<ConditionTree, Vec<String>> {
    let mut errors = Vec::new();

    let operation = match obj.get("operation") {
        Some(Value::String(s)) => match CompareOp::parse(s) {
            Some(op) => Some(op),
            None => {
                errors.push(format!(
                    "'operation' '{s}' is invalid (expected one of {})",
                    CompareOp::NAMES.join(", ")
                ));
                None
            }
        },
        _ => {
            errors.push("'operation' must be a string".to_string());
            None
        }
    };

    let left = validate_operand(obj, "left", &mut errors);
    let right = validate_operand(obj, "right", &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    match (operation, left, right) {
        (Some(operation), Some(left), Some(right)) => Ok(ConditionTree::Compare {
            operation,
            left,
            right,
        }),
        _ => Err(vec!["comparison is incomplete".to_string()]),
    }
}

fn validate_operand(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<Operand> {
    let Some(value) = obj.get(key) else {
        errors.push(format!("'{key}' is required"));
        return None;
    };
    let Some(operand) = value.as_object() else {
        errors.push(format!("'{key}' must be an object"));
        return None;
    };

    let value_type = match operand.get("value_type") {
        Some(Value::String(s)) => match s.as_str() {
            "variable" => Some(OperandKind::Variable),
            "constant" => Some(OperandKind::Constant),
            other => {
                errors.push(format!(
                    "'{key}' has invalid 'value_type' '{other}' (expected 'variable' or 'constant')"
                ));
                None
            }
        },
        _ => {
            errors.push(format!("'{key}' must contain a string 'value_type'"));
            None
        }
    };

    let inner = match operand.get("value") {
        Some(v) => Some(v.clone()),
        None => {
            errors.push(format!("'{key}' must contain 'value'"));
            None
        }
    };

    // A variable operand's value is the lookup key, so it must be a
    // string.
    if let (Some(OperandKind::Variable), Some(v)) = (value_type, inner.as_ref())
        && !v.is_string()
    {
        errors.push(format!("'{key}' variable operand needs a string 'value'"));
    }

    match (value_type, inner) {
        (Some(value_type), Some(value)) => Some(Operand { value_type, value }),
        _ => None,
    }
}
