//! In-memory port doubles for engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use serde_json::{Map, Value, json};
use taskloom_types::runlog::RunRecord;
use taskloom_types::template::{ExecKind, ParamSpec, ToolMetadata};
use uuid::Uuid;

use crate::error::EngineError;
use crate::port::{GeneratorBackend, MessageQueue, RunLogSink, TemplateSource, ToolRegistry};

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Raw template documents keyed by kind and id.
#[derive(Default)]
pub struct MapTemplates {
    docs: HashMap<(ExecKind, String), Value>,
}

impl MapTemplates {
    pub fn with(mut self, kind: ExecKind, id: &str, doc: Value) -> Self {
        self.docs.insert((kind, id.to_string()), doc);
        self
    }
}

impl TemplateSource for MapTemplates {
    fn fetch(&self, kind: ExecKind, id: &str) -> Result<Value, EngineError> {
        self.docs
            .get(&(kind, id.to_string()))
            .cloned()
            .ok_or_else(|| EngineError::TemplateNotFound {
                class: kind.to_string(),
                id: id.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Run-log sink
// ---------------------------------------------------------------------------

/// Keeps the latest persisted record per run id.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<HashMap<Uuid, RunRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<RunRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub fn records_for(&self, template_id: &str) -> Vec<RunRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.template_id == template_id)
            .collect()
    }
}

impl RunLogSink for MemorySink {
    fn persist(&self, record: &RunRecord) -> Result<(), EngineError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.run_id, record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Two fixed tools: `clock.now` (no inputs, one string output) and
/// `math.add` (two numbers in, `sum` out). Invocations are counted.
#[derive(Default)]
pub struct FixedTools {
    pub invocations: AtomicU32,
}

fn param(name: &str, ty: taskloom_types::param::ParamType) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        description: name.to_string(),
        ty,
        default: None,
    }
}

impl ToolRegistry for FixedTools {
    fn list(&self) -> Vec<ToolMetadata> {
        ["clock.now", "math.add"]
            .iter()
            .filter_map(|id| self.metadata(id))
            .collect()
    }

    fn metadata(&self, id: &str) -> Option<ToolMetadata> {
        use taskloom_types::param::ParamType::*;
        match id {
            "clock.now" => Some(ToolMetadata {
                id: id.to_string(),
                name: "now".to_string(),
                description: "fixed timestamp".to_string(),
                inputs: vec![],
                outputs: vec![param("now", String)],
            }),
            "math.add" => Some(ToolMetadata {
                id: id.to_string(),
                name: "add".to_string(),
                description: "add two numbers".to_string(),
                inputs: vec![param("a", Number), param("b", Number)],
                outputs: vec![param("sum", Number)],
            }),
            _ => None,
        }
    }

    fn invoke(
        &self,
        id: &str,
        inputs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, EngineError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let mut outputs = Map::new();
        match id {
            "clock.now" => {
                outputs.insert("now".to_string(), json!("2026-08-29T12:00:00Z"));
            }
            "math.add" => {
                let a = inputs.get("a").and_then(Value::as_f64).unwrap_or(0.0);
                let b = inputs.get("b").and_then(Value::as_f64).unwrap_or(0.0);
                outputs.insert("sum".to_string(), json!(a + b));
            }
            other => {
                return Err(EngineError::Runtime(format!("unknown tool '{other}'")));
            }
        }
        Ok(outputs)
    }
}

// ---------------------------------------------------------------------------
// Message queue
// ---------------------------------------------------------------------------

type Responder = Box<dyn Fn(&Value) -> Value + Send + Sync>;

/// Named FIFO queues. An optional responder answers every message
/// published to `request_queue` by pushing onto `response_queue`
/// synchronously, which keeps RPC tests deterministic without spawned
/// workers.
#[derive(Default)]
pub struct EchoQueue {
    queues: Mutex<HashMap<String, VecDeque<Value>>>,
    responder: Option<Responder>,
}

impl EchoQueue {
    pub fn with_responder(
        responder: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            queues: Mutex::default(),
            responder: Some(Box::new(responder)),
        }
    }

    /// Answer with `output` echoing the request's correlation id.
    pub fn answering_with(output: Value) -> Self {
        Self::with_responder(move |request| {
            json!({
                "correlation_id": request["correlation_id"],
                "output": output.clone(),
            })
        })
    }

    pub fn preload(&self, queue: &str, message: Value) {
        self.queues
            .lock()
            .unwrap()
            .entry(queue.to_string())
            .or_default()
            .push_back(message);
    }

    pub fn pending(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .unwrap()
            .get(queue)
            .map_or(0, VecDeque::len)
    }
}

impl MessageQueue for EchoQueue {
    async fn publish(&self, queue: &str, message: Value) -> Result<(), EngineError> {
        let mut queues = self.queues.lock().unwrap();
        if queue == super::action::REQUEST_QUEUE
            && let Some(responder) = &self.responder
        {
            let response = responder(&message);
            queues
                .entry(super::action::RESPONSE_QUEUE.to_string())
                .or_default()
                .push_back(response);
        }
        queues.entry(queue.to_string()).or_default().push_back(message);
        Ok(())
    }

    async fn take(&self, queue: &str) -> Result<Option<Value>, EngineError> {
        Ok(self
            .queues
            .lock()
            .unwrap()
            .get_mut(queue)
            .and_then(VecDeque::pop_front))
    }
}

// ---------------------------------------------------------------------------
// Generator backend
// ---------------------------------------------------------------------------

/// Succeeds with a fixture map after a configurable number of failures.
pub struct FlakyGenerator {
    outputs: Map<String, Value>,
    failures_left: AtomicU32,
    pub calls: AtomicU32,
}

impl FlakyGenerator {
    pub fn new(outputs: Map<String, Value>, failures: u32) -> Self {
        Self {
            outputs,
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    pub fn reliable(outputs: Map<String, Value>) -> Self {
        Self::new(outputs, 0)
    }

    pub fn always_failing() -> Self {
        Self::new(Map::new(), u32::MAX)
    }
}

impl GeneratorBackend for FlakyGenerator {
    async fn generate(
        &self,
        _id: &str,
        _inputs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            if left != u32::MAX {
                self.failures_left.store(left - 1, Ordering::SeqCst);
            }
            return Err(EngineError::Runtime("backend unavailable".to_string()));
        }
        Ok(self.outputs.clone())
    }
}
