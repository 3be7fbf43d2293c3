//! Engine error taxonomy.
//!
//! Three families matter to the dispatcher:
//! - template errors (structural defects, carrying every violation found
//!   in one validation pass) -- always fatal,
//! - parameter errors (a run's actual inputs/outputs break the declared
//!   contract) -- fatal and never retried, a wiring defect,
//! - runtime errors (operational failures: timeouts, downstream errors)
//!   -- retryable per the call's policy.

use taskloom_types::param::TypeCheckError;
use thiserror::Error;

/// Errors produced by validation and execution.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A template failed structural validation. Carries every violation
    /// found, not just the first.
    #[error("template validation failed:\n{}", format_issues(.0))]
    Template(Vec<String>),

    /// A run's actual inputs or outputs violate the template's declared
    /// parameter contract.
    #[error("parameter contract violation: {0}")]
    Parameter(String),

    /// No template exists for the requested class/id.
    #[error("template not found: {class}/{id}")]
    TemplateNotFound { class: String, id: String },

    /// A transient operational failure; retryable per policy.
    #[error("runtime failure: {0}")]
    Runtime(String),

    /// A remote action did not answer within the configured window.
    #[error("action '{action_id}' timed out after {timeout_secs}s")]
    ActionTimeout { action_id: String, timeout_secs: u64 },

    /// Process nesting exceeded the configured depth limit.
    #[error("call depth {depth} exceeds maximum {max}")]
    DepthExceeded { depth: u32, max: u32 },

    /// Condition or expression evaluation failed.
    #[error("condition evaluation failed: {0}")]
    Condition(String),

    /// Underlying I/O failure from a port implementation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON from a port implementation.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the dispatcher may retry after this error.
    ///
    /// Contract violations indicate a wiring defect, not a transient
    /// fault; retrying them can only fail the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Runtime(_) | Self::ActionTimeout { .. } | Self::Io(_)
        )
    }

    /// The violation list of a template error, if this is one.
    pub fn template_issues(&self) -> Option<&[String]> {
        match self {
            Self::Template(issues) => Some(issues),
            _ => None,
        }
    }
}

impl From<TypeCheckError> for EngineError {
    fn from(err: TypeCheckError) -> Self {
        Self::Parameter(err.to_string())
    }
}

fn format_issues(issues: &[String]) -> String {
    issues
        .iter()
        .map(|issue| format!("- {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskloom_types::param::ParamType;

    #[test]
    fn template_error_lists_every_issue() {
        let err = EngineError::Template(vec![
            "'name' must be a string".to_string(),
            "'execution' is required".to_string(),
        ]);
        let text = err.to_string();
        assert!(text.contains("- 'name' must be a string"));
        assert!(text.contains("- 'execution' is required"));
        assert_eq!(err.template_issues().unwrap().len(), 2);
    }

    #[test]
    fn retryability_split() {
        assert!(EngineError::Runtime("downstream 503".to_string()).is_retryable());
        assert!(
            EngineError::ActionTimeout {
                action_id: "a1".to_string(),
                timeout_secs: 30
            }
            .is_retryable()
        );
        assert!(!EngineError::Parameter("missing 'q'".to_string()).is_retryable());
        assert!(!EngineError::Template(vec![]).is_retryable());
        assert!(
            !EngineError::DepthExceeded { depth: 9, max: 8 }.is_retryable()
        );
    }

    #[test]
    fn type_check_error_converts_to_parameter() {
        let check = ParamType::Number.check("count", &json!("three")).unwrap_err();
        let err: EngineError = check.into();
        assert!(matches!(err, EngineError::Parameter(_)));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("'count'"));
    }
}
