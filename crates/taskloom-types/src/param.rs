//! Parameter type vocabulary and runtime value checking.
//!
//! Templates declare every input and output with one of six types. The
//! same check is applied at template-authoring time (defaults, literal
//! values) and at run time (actual inputs/outputs) -- only the failure
//! handling differs between the two call sites.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// ParamType
// ---------------------------------------------------------------------------

/// The fixed parameter type vocabulary.
///
/// `array` and `object` do not check element homogeneity; `vector` is an
/// array whose every element must be numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Bool,
    Array,
    Object,
    Vector,
}

impl ParamType {
    /// All valid type names, for error messages.
    pub const NAMES: [&'static str; 6] =
        ["string", "number", "bool", "array", "object", "vector"];

    /// Parse a type name as it appears in a template document.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "bool" => Some(Self::Bool),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            "vector" => Some(Self::Vector),
            _ => None,
        }
    }

    /// The lowercase name used in template documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Array => "array",
            Self::Object => "object",
            Self::Vector => "vector",
        }
    }

    /// Check a runtime value against this declared type.
    pub fn check(&self, param_name: &str, value: &Value) -> Result<(), TypeCheckError> {
        let ok = match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Vector => match value.as_array() {
                Some(items) => items.iter().all(Value::is_number),
                None => false,
            },
        };

        if ok {
            Ok(())
        } else {
            Err(TypeCheckError {
                param: param_name.to_string(),
                expected: *self,
                actual: value_shape(value),
            })
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A human-readable label for the JSON shape of a value.
fn value_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(items) if items.iter().all(Value::is_number) => "numeric array",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// TypeCheckError
// ---------------------------------------------------------------------------

/// A runtime value failed its declared parameter type.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parameter '{param}' must be {expected}, got {actual}")]
pub struct TypeCheckError {
    /// Name of the offending parameter.
    pub param: String,
    /// The declared type.
    pub expected: ParamType,
    /// The shape the value actually had.
    pub actual: &'static str,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_accepts_all_names() {
        for name in ParamType::NAMES {
            let ty = ParamType::parse(name).expect("known name");
            assert_eq!(ty.as_str(), name);
        }
        assert!(ParamType::parse("int").is_none());
        assert!(ParamType::parse("String").is_none());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ParamType::Vector).unwrap();
        assert_eq!(json, "\"vector\"");
        let parsed: ParamType = serde_json::from_str("\"number\"").unwrap();
        assert_eq!(parsed, ParamType::Number);
    }

    #[test]
    fn scalar_checks() {
        assert!(ParamType::String.check("q", &json!("hi")).is_ok());
        assert!(ParamType::Number.check("n", &json!(3.5)).is_ok());
        assert!(ParamType::Bool.check("b", &json!(true)).is_ok());
        assert!(ParamType::String.check("q", &json!(1)).is_err());
        assert!(ParamType::Number.check("n", &json!("3")).is_err());
    }

    #[test]
    fn array_and_object_do_not_check_elements() {
        assert!(
            ParamType::Array
                .check("xs", &json!([1, "mixed", true]))
                .is_ok()
        );
        assert!(
            ParamType::Object
                .check("o", &json!({"a": 1, "b": "x"}))
                .is_ok()
        );
        assert!(ParamType::Array.check("xs", &json!({"a": 1})).is_err());
    }

    #[test]
    fn vector_requires_every_element_numeric() {
        assert!(ParamType::Vector.check("v", &json!([1, 2.5, -3])).is_ok());
        assert!(ParamType::Vector.check("v", &json!([])).is_ok());
        let err = ParamType::Vector
            .check("v", &json!([1, "two"]))
            .unwrap_err();
        assert!(err.to_string().contains("'v'"));
        assert!(err.to_string().contains("vector"));
    }

    #[test]
    fn error_references_parameter_name() {
        let err = ParamType::Bool.check("enabled", &json!("yes")).unwrap_err();
        assert_eq!(err.param, "enabled");
        assert!(err.to_string().contains("'enabled'"));
        assert!(err.to_string().contains("bool"));
        assert!(err.to_string().contains("string"));
    }
}
