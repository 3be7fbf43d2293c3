//! `calculator.add`: numeric addition.

use serde_json::{Map, Value, json};
use taskloom_core::error::EngineError;
use taskloom_types::param::ParamType;
use taskloom_types::template::{ParamSpec, ToolMetadata};

use super::required_f64;

pub(super) const ADD_ID: &str = "calculator.add";

fn number(name: &str, description: &str) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        description: description.to_string(),
        ty: ParamType::Number,
        default: None,
    }
}

pub(super) fn add_metadata() -> ToolMetadata {
    ToolMetadata {
        id: ADD_ID.to_string(),
        name: "add".to_string(),
        description: "add two numbers".to_string(),
        inputs: vec![
            number("augend", "first operand"),
            number("addend", "second operand"),
        ],
        outputs: vec![number("sum", "augend + addend")],
    }
}

pub(super) fn add(inputs: &Map<String, Value>) -> Result<Map<String, Value>, EngineError> {
    let augend = required_f64(inputs, "augend")?;
    let addend = required_f64(inputs, "addend")?;

    let mut outputs = Map::new();
    outputs.insert("sum".to_string(), json!(augend + addend));
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_two_numbers() {
        let mut inputs = Map::new();
        inputs.insert("augend".to_string(), json!(40));
        inputs.insert("addend".to_string(), json!(2.5));
        let outputs = add(&inputs).unwrap();
        assert_eq!(outputs["sum"], json!(42.5));
    }

    #[test]
    fn non_numeric_operand_is_a_parameter_error() {
        let mut inputs = Map::new();
        inputs.insert("augend".to_string(), json!("forty"));
        inputs.insert("addend".to_string(), json!(2));
        assert!(matches!(
            add(&inputs).unwrap_err(),
            EngineError::Parameter(_)
        ));
    }
}
