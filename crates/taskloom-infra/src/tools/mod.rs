//! Local tool registry.
//!
//! Tools are in-process executables with a declared parameter contract;
//! their metadata doubles as their template. The registry is a fixed set
//! wired at construction, not a plugin system.

mod calculator;
mod local;
mod parser;

use serde_json::{Map, Value};
use taskloom_core::error::EngineError;
use taskloom_core::port::ToolRegistry;
use taskloom_types::template::ToolMetadata;

/// The built-in tools: `local.local_time`, `local.local_address`,
/// `calculator.add`, `parser.json_parser`, `parser.xml_parser`.
#[derive(Default)]
pub struct LocalToolRegistry;

impl LocalToolRegistry {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRegistry for LocalToolRegistry {
    fn list(&self) -> Vec<ToolMetadata> {
        vec![
            local::local_time_metadata(),
            local::local_address_metadata(),
            calculator::add_metadata(),
            parser::json_parser_metadata(),
            parser::xml_parser_metadata(),
        ]
    }

    fn metadata(&self, id: &str) -> Option<ToolMetadata> {
        self.list().into_iter().find(|meta| meta.id == id)
    }

    fn invoke(
        &self,
        id: &str,
        inputs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, EngineError> {
        match id {
            local::LOCAL_TIME_ID => local::local_time(inputs),
            local::LOCAL_ADDRESS_ID => local::local_address(inputs),
            calculator::ADD_ID => calculator::add(inputs),
            parser::JSON_PARSER_ID => parser::json_parser(inputs),
            parser::XML_PARSER_ID => parser::xml_parser(inputs),
            other => Err(EngineError::TemplateNotFound {
                class: "tool".to_string(),
                id: other.to_string(),
            }),
        }
    }
}

/// Read one required string input.
fn required_str<'a>(inputs: &'a Map<String, Value>, name: &str) -> Result<&'a str, EngineError> {
    inputs
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Parameter(format!("tool input '{name}' must be a string")))
}

/// Read one required numeric input.
fn required_f64(inputs: &Map<String, Value>, name: &str) -> Result<f64, EngineError> {
    inputs
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| EngineError::Parameter(format!("tool input '{name}' must be a number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_all_builtin_tools() {
        let registry = LocalToolRegistry::new();
        let ids: Vec<String> = registry.list().into_iter().map(|m| m.id).collect();
        assert_eq!(
            ids,
            vec![
                "local.local_time",
                "local.local_address",
                "calculator.add",
                "parser.json_parser",
                "parser.xml_parser"
            ]
        );
        assert!(registry.metadata("calculator.add").is_some());
        assert!(registry.metadata("calculator.divide").is_none());
    }

    #[test]
    fn unknown_tool_is_not_found() {
        let err = LocalToolRegistry::new()
            .invoke("nope", &Map::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::TemplateNotFound { .. }));
    }
}
