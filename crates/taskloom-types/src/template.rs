//! The validated template model.
//!
//! A template is the canonical JSON document describing one executable:
//! its parameter contract (`inputs`/`outputs`) and, for schedulers, its
//! execution graph. Values of these types are only produced by the
//! validator in `taskloom-core` -- deserialization alone does not make a
//! template valid, because validation collects every structural defect
//! rather than failing on the first serde error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::param::ParamType;

// ---------------------------------------------------------------------------
// Executable kinds
// ---------------------------------------------------------------------------

/// Every executable kind the engine knows, including the root `task`.
///
/// The lowercase name doubles as the template directory name and the
/// CLI `--class-name` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecKind {
    Task,
    Process,
    Action,
    Generator,
    Tool,
}

impl ExecKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "task" => Some(Self::Task),
            "process" => Some(Self::Process),
            "action" => Some(Self::Action),
            "generator" => Some(Self::Generator),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Process => "process",
            Self::Action => "action",
            Self::Generator => "generator",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for ExecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kinds a `call` may target. A call can never target another task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Action,
    Generator,
    Process,
    Tool,
}

impl CallKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "action" => Some(Self::Action),
            "generator" => Some(Self::Generator),
            "process" => Some(Self::Process),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Generator => "generator",
            Self::Process => "process",
            Self::Tool => "tool",
        }
    }

    /// The matching template-store kind.
    pub fn exec_kind(&self) -> ExecKind {
        match self {
            Self::Action => ExecKind::Action,
            Self::Generator => ExecKind::Generator,
            Self::Process => ExecKind::Process,
            Self::Tool => ExecKind::Tool,
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A validated template document. Immutable once validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Human-readable template name.
    pub name: String,
    /// Longer description.
    pub description: String,
    /// Declared inputs; `None` means the template takes no inputs.
    pub inputs: Option<Vec<ParamSpec>>,
    /// Declared outputs; `None` means the template produces no outputs.
    pub outputs: Option<Vec<ParamSpec>>,
    /// Execution graph. Present for task/process templates; absent for
    /// leaf executables (action/generator), whose contract is parameters
    /// only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionSpec>,
}

/// One declared parameter of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, unique within its list.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub ty: ParamType,
    /// Optional default, type-checked against `ty` at validation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

// ---------------------------------------------------------------------------
// Calls and bindings
// ---------------------------------------------------------------------------

/// A single typed invocation of one executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSpec {
    /// Which executable kind to invoke.
    #[serde(rename = "class")]
    pub kind: CallKind,
    /// Template id (or tool id) of the callee.
    pub id: String,
    /// Caller-side input bindings.
    #[serde(default)]
    pub inputs: Vec<InputBinding>,
    /// Caller-side output bindings.
    #[serde(default)]
    pub outputs: Vec<OutputBinding>,
    /// Retry and failure policy for this call.
    #[serde(default)]
    pub error_handling: ErrorPolicy,
}

/// Connects one callee input parameter to a literal or a variable-space
/// entry. Exactly one of `value`/`source` appears in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBinding {
    /// The callee's parameter name.
    pub name: String,
    /// Declared type; the resolved value is checked against it.
    #[serde(rename = "type")]
    pub ty: ParamType,
    /// Where the value comes from.
    #[serde(flatten)]
    pub source: BindingSource,
}

/// The two ways a call input can be supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingSource {
    /// A literal value embedded in the template.
    #[serde(rename = "value")]
    Literal(Value),
    /// The name of a variable-space entry to read.
    #[serde(rename = "source")]
    Variable(String),
}

/// Routes one callee output into the caller's variable space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputBinding {
    /// The key expected in the callee's returned outputs.
    pub name: String,
    /// Declared type; the returned value is checked against it.
    #[serde(rename = "type")]
    pub ty: ParamType,
    /// The variable-space key to write.
    pub target: String,
}

// ---------------------------------------------------------------------------
// Error policy
// ---------------------------------------------------------------------------

/// What to do when a call's invocation fails for operational reasons.
///
/// Contract violations (template or parameter errors) ignore this policy
/// entirely: they are never retried and never skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPolicy {
    /// Applied after retries are exhausted.
    #[serde(default)]
    pub strategy: ErrorStrategy,
    /// Retry configuration.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            strategy: ErrorStrategy::Abort,
            retry: RetryPolicy::default(),
        }
    }
}

/// Terminal failure handling for a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStrategy {
    /// Propagate the failure, terminating the enclosing process.
    #[default]
    Abort,
    /// Treat the call as producing no outputs and continue.
    Skip,
}

/// Bounded retry with fixed backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Whether retries are attempted at all.
    #[serde(default)]
    pub enabled: bool,
    /// Number of retries after the initial attempt, 1..=15.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Seconds to sleep between attempts, 0..=1000.
    #[serde(default = "default_retry_interval")]
    pub interval: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            retry_count: default_retry_count(),
            interval: default_retry_interval(),
        }
    }
}

fn default_retry_count() -> u32 {
    1
}

fn default_retry_interval() -> u64 {
    1
}

impl ErrorPolicy {
    /// Total attempts: the initial one plus retries when enabled.
    pub fn max_attempts(&self) -> u32 {
        if self.retry.enabled {
            1 + self.retry.retry_count
        } else {
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Execution graphs
// ---------------------------------------------------------------------------

/// The execution graph of a scheduler template, tagged by `type`.
///
/// Task templates use the `call` form (a single top-level call, almost
/// always a process); process templates use one of the four control-flow
/// forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecutionSpec {
    /// A single call (task execution).
    Call { call: CallSpec },
    /// Ordered steps executed one after another.
    Sequence { steps: Vec<Step> },
    /// First-matching-condition branch selection.
    Select { cases: Vec<Case> },
    /// Repeat a body call while a condition/iteration bound holds.
    Loop(LoopSpec),
    /// Concurrent branches joined before output extraction.
    Parallel { branches: Vec<Branch> },
}

/// One step of a sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position; must equal the step's place in the list.
    pub order: u32,
    /// What this step does.
    pub description: String,
    /// The call to dispatch.
    pub call: CallSpec,
}

/// One case of a select. At least one of `expression`/`condition` is
/// present; when both are, the structured condition wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    /// JEXL expression evaluated against the variable space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Structured condition tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionTree>,
    /// What this case covers.
    pub description: String,
    /// The call dispatched when the case matches.
    pub call: CallSpec,
}

/// Loop execution: re-evaluate the bound before every iteration.
/// At least one of `condition`/`max_iterations` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSpec {
    /// Continue while this condition holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionTree>,
    /// Hard iteration bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u64>,
    /// The body call dispatched each iteration.
    pub call: CallSpec,
}

/// One branch of a parallel execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// What this branch does.
    pub description: String,
    /// The call dispatched concurrently with its siblings.
    pub call: CallSpec,
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// A recursive boolean condition: either a logical combinator over
/// sub-conditions or a single comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionTree {
    Logical {
        #[serde(rename = "type")]
        op: LogicalOp,
        conditions: Vec<ConditionTree>,
    },
    Compare {
        operation: CompareOp,
        left: Operand,
        right: Operand,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

/// The fixed comparison grammar. Names match the template document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    pub const NAMES: [&'static str; 9] = [
        "equals",
        "notEquals",
        "greaterThan",
        "lessThan",
        "greaterThanOrEqual",
        "lessThanOrEqual",
        "contains",
        "startsWith",
        "endsWith",
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "equals" => Some(Self::Equals),
            "notEquals" => Some(Self::NotEquals),
            "greaterThan" => Some(Self::GreaterThan),
            "lessThan" => Some(Self::LessThan),
            "greaterThanOrEqual" => Some(Self::GreaterThanOrEqual),
            "lessThanOrEqual" => Some(Self::LessThanOrEqual),
            "contains" => Some(Self::Contains),
            "startsWith" => Some(Self::StartsWith),
            "endsWith" => Some(Self::EndsWith),
            _ => None,
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
    /// Whether `value` is a space lookup key or a literal.
    pub value_type: OperandKind,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandKind {
    /// `value` names a variable-space entry.
    Variable,
    /// `value` is used literally.
    Constant,
}

// ---------------------------------------------------------------------------
// Tool metadata
// ---------------------------------------------------------------------------

/// Static metadata describing one registered tool. This is the "template"
/// of the tool executable kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Tool id, e.g. `local.local_time`.
    pub id: String,
    /// Callable name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// Declared inputs.
    pub inputs: Vec<ParamSpec>,
    /// Declared outputs.
    pub outputs: Vec<ParamSpec>,
}

impl ToolMetadata {
    /// View this tool's contract as a leaf template.
    pub fn to_template(&self) -> Template {
        Template {
            name: self.name.clone(),
            description: self.description.clone(),
            inputs: Some(self.inputs.clone()),
            outputs: Some(self.outputs.clone()),
            execution: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
