//! Ports implemented by the infrastructure layer.
//!
//! The engine core never touches the filesystem, a broker, or a model
//! endpoint directly; it goes through these traits. Storage-shaped ports
//! (`TemplateSource`, `RunLogSink`, `ToolRegistry`) are synchronous and
//! object-safe so they can live behind `Arc<dyn _>`; the I/O-bound ports
//! (`MessageQueue`, `GeneratorBackend`) are async and resolved as engine
//! type parameters.

use std::future::Future;

use serde_json::{Map, Value};
use taskloom_types::template::{ExecKind, ToolMetadata};

use crate::error::EngineError;

/// Where raw template documents come from.
///
/// `fetch` returns the unvalidated JSON document; validation is the
/// engine's job. Implementations must distinguish a missing template
/// ([`EngineError::TemplateNotFound`]) from an unreadable one.
pub trait TemplateSource: Send + Sync {
    fn fetch(&self, kind: ExecKind, id: &str) -> Result<Value, EngineError>;
}

/// Where run records are persisted.
///
/// Called once per record mutation; implementations replace the stored
/// record wholesale, so the sink always holds the latest state.
pub trait RunLogSink: Send + Sync {
    fn persist(&self, record: &taskloom_types::runlog::RunRecord) -> Result<(), EngineError>;
}

/// The registry of locally executable tools.
pub trait ToolRegistry: Send + Sync {
    /// Metadata for every registered tool.
    fn list(&self) -> Vec<ToolMetadata>;

    /// Metadata for one tool, if registered.
    fn metadata(&self, id: &str) -> Option<ToolMetadata>;

    /// Invoke a tool synchronously with already-resolved inputs.
    fn invoke(&self, id: &str, inputs: &Map<String, Value>) -> Result<Map<String, Value>, EngineError>;
}

/// The broker carrying action requests and responses.
///
/// Queues are named and FIFO. `take` removes and returns the head of a
/// queue, or `None` when it is empty; correlation matching is the
/// caller's concern (an unmatched response is re-published).
pub trait MessageQueue: Send + Sync {
    fn publish(
        &self,
        queue: &str,
        message: Value,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn take(&self, queue: &str) -> impl Future<Output = Result<Option<Value>, EngineError>> + Send;
}

/// The model endpoint behind generator executables.
pub trait GeneratorBackend: Send + Sync {
    fn generate(
        &self,
        id: &str,
        inputs: &Map<String, Value>,
    ) -> impl Future<Output = Result<Map<String, Value>, EngineError>> + Send;
}
