//! Predicate evaluation against the variable space.
//!
//! Select cases and loop bounds come in two forms: a structured
//! condition tree (evaluated natively, short-circuiting) or a JEXL
//! expression string (evaluated with the whole space as context). Either
//! way the result must be a boolean; anything else is an evaluation
//! error, not a falsy value.

use jexl_eval::Evaluator;
use serde_json::Value;
use taskloom_types::template::{CompareOp, ConditionTree, LogicalOp, Operand, OperandKind};

use crate::error::EngineError;
use crate::space::VariableSpace;

/// Evaluate a structured condition tree.
pub fn eval_condition(tree: &ConditionTree, space: &VariableSpace) -> Result<bool, EngineError> {
    match tree {
        ConditionTree::Logical { op, conditions } => {
            for condition in conditions {
                let holds = eval_condition(condition, space)?;
                match op {
                    LogicalOp::And if !holds => return Ok(false),
                    LogicalOp::Or if holds => return Ok(true),
                    _ => {}
                }
            }
            Ok(matches!(op, LogicalOp::And))
        }
        ConditionTree::Compare {
            operation,
            left,
            right,
        } => {
            let left = resolve_operand(left, space)?;
            let right = resolve_operand(right, space)?;
            compare(*operation, &left, &right)
        }
    }
}

/// Evaluate a JEXL expression with the variable space as its context.
pub fn eval_expression(expression: &str, space: &VariableSpace) -> Result<bool, EngineError> {
    let context = Value::Object(space.as_map().clone());
    let result = Evaluator::new()
        .eval_in_context(expression, &context)
        .map_err(|err| {
            EngineError::Condition(format!("expression '{expression}' failed: {err}"))
        })?;
    match result {
        Value::Bool(b) => Ok(b),
        other => Err(EngineError::Condition(format!(
            "expression '{expression}' evaluated to non-boolean {other}"
        ))),
    }
}

/// A variable operand reads the space; a constant is taken as written.
fn resolve_operand(operand: &Operand, space: &VariableSpace) -> Result<Value, EngineError> {
    match operand.value_type {
        OperandKind::Constant => Ok(operand.value.clone()),
        OperandKind::Variable => {
            let key = operand.value.as_str().ok_or_else(|| {
                EngineError::Condition(format!(
                    "variable operand must name a variable, got {}",
                    operand.value
                ))
            })?;
            space.get(key).cloned().ok_or_else(|| {
                EngineError::Condition(format!("condition reads missing variable '{key}'"))
            })
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EngineError> {
    match op {
        CompareOp::Equals => Ok(left == right),
        CompareOp::NotEquals => Ok(left != right),
        CompareOp::GreaterThan => ordering(op, left, right).map(|o| o.is_gt()),
        CompareOp::LessThan => ordering(op, left, right).map(|o| o.is_lt()),
        CompareOp::GreaterThanOrEqual => ordering(op, left, right).map(|o| o.is_ge()),
        CompareOp::LessThanOrEqual => ordering(op, left, right).map(|o| o.is_le()),
        CompareOp::Contains => contains(left, right),
        CompareOp::StartsWith => {
            let (l, r) = both_strings(op, left, right)?;
            Ok(l.starts_with(r))
        }
        CompareOp::EndsWith => {
            let (l, r) = both_strings(op, left, right)?;
            Ok(l.ends_with(r))
        }
    }
}

/// Ordering is defined for two numbers or two strings, nothing else.
fn ordering(op: CompareOp, left: &Value, right: &Value) -> Result<std::cmp::Ordering, EngineError> {
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l.partial_cmp(&r).ok_or_else(|| {
            EngineError::Condition("cannot order NaN".to_string())
        });
    }
    if let (Some(l), Some(r)) = (left.as_str(), right.as_str()) {
        return Ok(l.cmp(r));
    }
    Err(EngineError::Condition(format!(
        "cannot apply {op:?} to {left} and {right}; operands must both be numbers or both strings"
    )))
}

/// `contains` covers substring search on strings and membership on
/// arrays.
fn contains(left: &Value, right: &Value) -> Result<bool, EngineError> {
    match left {
        Value::String(haystack) => {
            let needle = right.as_str().ok_or_else(|| {
                EngineError::Condition(format!(
                    "contains on a string needs a string operand, got {right}"
                ))
            })?;
            Ok(haystack.contains(needle))
        }
        Value::Array(items) => Ok(items.contains(right)),
        other => Err(EngineError::Condition(format!(
            "contains needs a string or array left operand, got {other}"
        ))),
    }
}

fn both_strings<'a>(
    op: CompareOp,
    left: &'a Value,
    right: &'a Value,
) -> Result<(&'a str, &'a str), EngineError> {
    match (left.as_str(), right.as_str()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(EngineError::Condition(format!(
            "{op:?} needs string operands, got {left} and {right}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn space(pairs: &[(&str, Value)]) -> VariableSpace {
        let mut space = VariableSpace::default();
        for (k, v) in pairs {
            space.insert(*k, v.clone());
        }
        space
    }

    fn cmp(op: CompareOp, left: Operand, right: Operand) -> ConditionTree {
        ConditionTree::Compare {
            operation: op,
            left,
            right,
        }
    }

    fn var(name: &str) -> Operand {
        Operand {
            value_type: OperandKind::Variable,
            value: json!(name),
        }
    }

    fn constant(value: Value) -> Operand {
        Operand {
            value_type: OperandKind::Constant,
            value,
        }
    }

    #[test]
    fn numeric_and_string_ordering() {
        let s = space(&[("count", json!(5)), ("name", json!("beta"))]);
        assert!(
            eval_condition(
                &cmp(CompareOp::GreaterThan, var("count"), constant(json!(3))),
                &s
            )
            .unwrap()
        );
        assert!(
            eval_condition(
                &cmp(CompareOp::LessThan, var("name"), constant(json!("gamma"))),
                &s
            )
            .unwrap()
        );
        let err = eval_condition(
            &cmp(CompareOp::GreaterThan, var("name"), constant(json!(3))),
            &s,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Condition(_)));
    }

    #[test]
    fn contains_on_strings_and_arrays() {
        let s = space(&[
            ("text", json!("tomorrow in beijing")),
            ("tags", json!(["weather", "travel"])),
        ]);
        assert!(
            eval_condition(
                &cmp(CompareOp::Contains, var("text"), constant(json!("beijing"))),
                &s
            )
            .unwrap()
        );
        assert!(
            eval_condition(
                &cmp(CompareOp::Contains, var("tags"), constant(json!("travel"))),
                &s
            )
            .unwrap()
        );
        assert!(
            !eval_condition(
                &cmp(CompareOp::Contains, var("tags"), constant(json!("food"))),
                &s
            )
            .unwrap()
        );
    }

    #[test]
    fn logical_short_circuit_skips_broken_branches() {
        // The second comparison reads a missing variable, but `or`
        // short-circuits on the first.
        let s = space(&[("done", json!(true))]);
        let tree = ConditionTree::Logical {
            op: LogicalOp::Or,
            conditions: vec![
                cmp(CompareOp::Equals, var("done"), constant(json!(true))),
                cmp(CompareOp::Equals, var("missing"), constant(json!(1))),
            ],
        };
        assert!(eval_condition(&tree, &s).unwrap());

        let and_tree = ConditionTree::Logical {
            op: LogicalOp::And,
            conditions: vec![
                cmp(CompareOp::Equals, var("done"), constant(json!(false))),
                cmp(CompareOp::Equals, var("missing"), constant(json!(1))),
            ],
        };
        assert!(!eval_condition(&and_tree, &s).unwrap());
    }

    #[test]
    fn empty_logical_nodes_have_identity_values() {
        let s = VariableSpace::default();
        let and = ConditionTree::Logical {
            op: LogicalOp::And,
            conditions: vec![],
        };
        let or = ConditionTree::Logical {
            op: LogicalOp::Or,
            conditions: vec![],
        };
        assert!(eval_condition(&and, &s).unwrap());
        assert!(!eval_condition(&or, &s).unwrap());
    }

    #[test]
    fn missing_variable_is_an_error_not_false() {
        let s = VariableSpace::default();
        let err = eval_condition(
            &cmp(CompareOp::Equals, var("absent"), constant(json!(1))),
            &s,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'absent'"));
    }

    #[test]
    fn jexl_expression_evaluates_against_the_space() {
        let s = space(&[("count", json!(5)), ("kind", json!("weather"))]);
        assert!(eval_expression("count > 3 && kind == 'weather'", &s).unwrap());
        assert!(!eval_expression("count > 9", &s).unwrap());
    }

    #[test]
    fn non_boolean_expression_result_is_an_error() {
        let s = space(&[("count", json!(5))]);
        let err = eval_expression("count + 1", &s).unwrap_err();
        assert!(err.to_string().contains("non-boolean"));
    }
}
