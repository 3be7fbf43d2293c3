//! Execution-graph validation for task and process templates.
//!
//! A task's `execution` is a single call; a process's `execution` is one
//! of the four control-flow forms, dispatched on its `type` tag.

use std::collections::HashSet;

use serde_json::Value;
use taskloom_types::template::{Branch, Case, ExecutionSpec, LoopSpec, Step};

use super::call::validate_call;
use super::condition::validate_condition;
use super::require_string;

/// A task executes exactly one call, conventionally a process. The
/// normalized form carries a `type: "call"` tag; raw documents may omit
/// it.
pub fn validate_task_execution(doc: &Value) -> Result<ExecutionSpec, Vec<String>> {
    let Some(obj) = doc.as_object() else {
        return Err(vec!["must be an object".to_string()]);
    };

    if let Some(tag) = obj.get("type")
        && tag != "call"
    {
        return Err(vec![format!(
            "task execution must be a single call, found 'type' {tag}"
        )]);
    }

    let Some(call_doc) = obj.get("call") else {
        return Err(vec!["task execution must contain 'call'".to_string()]);
    };

    let call = validate_call(call_doc).map_err(|sub| {
        sub.into_iter()
            .map(|e| format!("'call': {e}"))
            .collect::<Vec<_>>()
    })?;
    Ok(ExecutionSpec::Call { call })
}

/// Dispatch a process execution graph on its `type` tag.
pub fn validate_process_execution(doc: &Value) -> Result<ExecutionSpec, Vec<String>> {
    let Some(obj) = doc.as_object() else {
        return Err(vec!["must be an object".to_string()]);
    };

    let mut errors = Vec::new();
    let Some(tag) = require_string(obj, "type", &mut errors) else {
        return Err(errors);
    };

    match tag.as_str() {
        "sequence" => validate_sequence(obj),
        "select" => validate_select(obj),
        "loop" => validate_loop(obj),
        "parallel" => validate_parallel(obj),
        other => Err(vec![format!(
            "unknown execution 'type' '{other}' (expected sequence, select, loop, or parallel)"
        )]),
    }
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

fn validate_sequence(obj: &serde_json::Map<String, Value>) -> Result<ExecutionSpec, Vec<String>> {
    let mut errors = Vec::new();
    let items = require_nonempty_list(obj, "steps", &mut errors);

    let mut steps = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let position = (idx + 1) as u32;
        match validate_step(item, position) {
            Ok(step) => steps.push(step),
            Err(sub) => errors.extend(sub.into_iter().map(|e| format!("step {position}: {e}"))),
        }
    }

    if errors.is_empty() {
        Ok(ExecutionSpec::Sequence { steps })
    } else {
        Err(errors)
    }
}

/// Validate one step. An explicit `order` must equal the step's 1-based
/// position; a missing `order` is filled from the position.
fn validate_step(doc: &Value, position: u32) -> Result<Step, Vec<String>> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec!["each step must be an object".to_string()]);
    };

    let order = match obj.get("order") {
        Some(value) => match value.as_u64() {
            Some(n) if n == u64::from(position) => position,
            Some(n) => {
                errors.push(format!("'order' is {n} but the step is at position {position}"));
                position
            }
            None => {
                errors.push("'order' must be a positive integer".to_string());
                position
            }
        },
        None => position,
    };

    let description = require_string(obj, "description", &mut errors);
    let call = validate_call_field(obj, &mut errors);

    finish_step(errors, order, description, call)
}

fn finish_step(
    errors: Vec<String>,
    order: u32,
    description: Option<String>,
    call: Option<taskloom_types::template::CallSpec>,
) -> Result<Step, Vec<String>> {
    if !errors.is_empty() {
        return Err(errors);
    }
    match (description, call) {
        (Some(description), Some(call)) => Ok(Step {
            order,
            description,
            call,
        }),
        _ => Err(vec!["step is incomplete".to_string()]),
    }
}

// ---------------------------------------------------------------------------
// Select
// ---------------------------------------------------------------------------

fn validate_select(obj: &serde_json::Map<String, Value>) -> Result<ExecutionSpec, Vec<String>> {
    let mut errors = Vec::new();
    let items = require_nonempty_list(obj, "cases", &mut errors);

    let mut cases = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match validate_case(item) {
            Ok(case) => cases.push(case),
            Err(sub) => errors.extend(sub.into_iter().map(|e| format!("case {}: {e}", idx + 1))),
        }
    }

    if errors.is_empty() {
        Ok(ExecutionSpec::Select { cases })
    } else {
        Err(errors)
    }
}

/// Validate one case: at least one of `expression`/`condition`, plus
/// `description` and `call`.
fn validate_case(doc: &Value) -> Result<Case, Vec<String>> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec!["each case must be an object".to_string()]);
    };

    let expression = match obj.get("expression") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push("'expression' must be a string".to_string());
            None
        }
        None => None,
    };

    let condition = match obj.get("condition") {
        Some(condition_doc) => match validate_condition(condition_doc) {
            Ok(tree) => Some(tree),
            Err(sub) => {
                errors.extend(sub.into_iter().map(|e| format!("'condition': {e}")));
                None
            }
        },
        None => None,
    };

    if !obj.contains_key("expression") && !obj.contains_key("condition") {
        errors.push("case needs 'expression' or 'condition'".to_string());
    }

    let description = require_string(obj, "description", &mut errors);
    let call = validate_call_field(obj, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Case {
        expression,
        condition,
        description: description.unwrap_or_default(),
        call: call.ok_or_else(|| vec!["case is incomplete".to_string()])?,
    })
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

fn validate_loop(obj: &serde_json::Map<String, Value>) -> Result<ExecutionSpec, Vec<String>> {
    let mut errors = Vec::new();

    let condition = match obj.get("condition") {
        Some(condition_doc) => match validate_condition(condition_doc) {
            Ok(tree) => Some(tree),
            Err(sub) => {
                errors.extend(sub.into_iter().map(|e| format!("'condition': {e}")));
                None
            }
        },
        None => None,
    };

    let max_iterations = match obj.get("max_iterations") {
        Some(value) => match value.as_u64() {
            Some(0) => {
                errors.push("'max_iterations' must be at least 1".to_string());
                None
            }
            Some(n) => Some(n),
            None => {
                errors.push("'max_iterations' must be a positive integer".to_string());
                None
            }
        },
        None => None,
    };

    if !obj.contains_key("condition") && !obj.contains_key("max_iterations") {
        errors.push("loop needs 'condition' or 'max_iterations'; it would never terminate".to_string());
    }

    let call = validate_call_field(obj, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ExecutionSpec::Loop(LoopSpec {
        condition,
        max_iterations,
        call: call.ok_or_else(|| vec!["loop is incomplete".to_string()])?,
    }))
}

// ---------------------------------------------------------------------------
// Parallel
// ---------------------------------------------------------------------------

fn validate_parallel(obj: &serde_json::Map<String, Value>) -> Result<ExecutionSpec, Vec<String>> {
    let mut errors = Vec::new();
    let items = require_nonempty_list(obj, "branches", &mut errors);

    let mut branches = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match validate_branch(item) {
            Ok(branch) => branches.push(branch),
            Err(sub) => errors.extend(sub.into_iter().map(|e| format!("branch {}: {e}", idx + 1))),
        }
    }

    // Two branches writing the same target would race; the winner would
    // depend on completion order.
    let mut targets = HashSet::new();
    for (idx, branch) in branches.iter().enumerate() {
        for output in &branch.call.outputs {
            if !targets.insert(output.target.clone()) {
                errors.push(format!(
                    "branch {}: duplicate output target '{}' across branches",
                    idx + 1,
                    output.target
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(ExecutionSpec::Parallel { branches })
    } else {
        Err(errors)
    }
}

fn validate_branch(doc: &Value) -> Result<Branch, Vec<String>> {
    let mut errors = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec!["each branch must be an object".to_string()]);
    };

    let description = require_string(obj, "description", &mut errors);
    let call = validate_call_field(obj, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Branch {
        description: description.unwrap_or_default(),
        call: call.ok_or_else(|| vec!["branch is incomplete".to_string()])?,
    })
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

fn validate_call_field(
    obj: &serde_json::Map<String, Value>,
    errors: &mut Vec<String>,
) -> Option<taskloom_types::template::CallSpec> {
    let Some(call_doc) = obj.get("call") else {
        errors.push("'call' is required".to_string());
        return None;
    };
    match validate_call(call_doc) {
        Ok(call) => Some(call),
        Err(sub) => {
            errors.extend(sub.into_iter().map(|e| format!("'call': {e}")));
            None
        }
    }
}

fn require_nonempty_list<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> &'a [Value] {
    match obj.get(key) {
        Some(Value::Array(items)) => {
            if items.is_empty() {
                errors.push(format!("'{key}' must not be empty"));
            }
            items
        }
        Some(_) => {
            errors.push(format!("'{key}' must be a list"));
            &[]
        }
        None => {
            errors.push(format!("'{key}' is required"));
            &[]
        }
    }
}
