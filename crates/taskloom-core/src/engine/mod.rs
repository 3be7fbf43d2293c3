//! The execution engine.
//!
//! One [`Engine`] instance serves any number of runs. Entry points load
//! and validate the target template, open a run record, seed the
//! variable space, drive the execution graph, and close the record with
//! the outcome. Storage ports are held behind `Arc<dyn _>`; the message
//! queue and generator backend are type parameters so their async
//! methods stay statically dispatched.

mod action;
mod dispatch;
mod flow;

use std::sync::Arc;

use serde_json::{Map, Value};
use taskloom_types::config::EngineConfig;
use taskloom_types::template::{ExecKind, ParamSpec, Template};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::port::{GeneratorBackend, MessageQueue, RunLogSink, TemplateSource, ToolRegistry};
use crate::runlog::RuntimeLog;
use crate::space::VariableSpace;
use crate::validate::validate_template;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine<Q, G> {
    templates: Arc<dyn TemplateSource>,
    sink: Arc<dyn RunLogSink>,
    tools: Arc<dyn ToolRegistry>,
    queue: Q,
    generator: G,
    config: EngineConfig,
    /// Serializes the response-queue fetch-or-requeue critical section.
    response_lock: Mutex<()>,
}

/// Ambient identifiers of the run a dispatch happens inside.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// The root task id, threaded through every nested run.
    pub task_id: Option<String>,
    /// The enclosing run, i.e. the parent of any run dispatched next.
    pub run_id: Option<Uuid>,
    /// Process nesting depth; the root is 0.
    pub depth: u32,
}

impl RunContext {
    pub fn root(task_id: Option<String>) -> Self {
        Self {
            task_id,
            run_id: None,
            depth: 0,
        }
    }

    /// The context seen from inside a freshly opened run.
    fn enter(&self, run_id: Uuid) -> Self {
        Self {
            task_id: self.task_id.clone(),
            run_id: Some(run_id),
            depth: self.depth,
        }
    }

    /// One process-nesting level deeper.
    fn deepen(&self) -> Self {
        Self {
            task_id: self.task_id.clone(),
            run_id: self.run_id,
            depth: self.depth + 1,
        }
    }
}

impl<Q, G> Engine<Q, G>
where
    Q: MessageQueue,
    G: GeneratorBackend,
{
    pub fn new(
        templates: Arc<dyn TemplateSource>,
        sink: Arc<dyn RunLogSink>,
        tools: Arc<dyn ToolRegistry>,
        queue: Q,
        generator: G,
        config: EngineConfig,
    ) -> Self {
        Self {
            templates,
            sink,
            tools,
            queue,
            generator,
            config,
            response_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fetch and validate one template.
    pub fn load_template(&self, kind: ExecKind, id: &str) -> Result<Template, EngineError> {
        let doc = self.templates.fetch(kind, id)?;
        validate_template(kind, &doc)
    }

    /// The registered tools, as leaf templates.
    pub fn tools(&self) -> &dyn ToolRegistry {
        self.tools.as_ref()
    }

    /// The raw template source, for callers that need the unvalidated
    /// document.
    pub fn templates(&self) -> &dyn TemplateSource {
        self.templates.as_ref()
    }

    // -----------------------------------------------------------------------
    // Run entry points
    // -----------------------------------------------------------------------

    /// Run a task end to end: the root entry point.
    pub async fn run_task(
        &self,
        task_id: &str,
        inputs: Map<String, Value>,
    ) -> Result<Map<String, Value>, EngineError> {
        let template = self.load_template(ExecKind::Task, task_id)?;
        let run_id = Uuid::now_v7();
        info!(task_id, %run_id, "starting task run");

        let log = Mutex::new(RuntimeLog::open(
            self.sink.clone(),
            run_id,
            task_id,
            ExecKind::Task,
            Some(task_id.to_string()),
            None,
            inputs.clone(),
        )?);
        let ctx = RunContext::root(Some(task_id.to_string())).enter(run_id);

        let outcome = self.drive(&template, inputs, &log, &ctx).await;
        self.close(&log, task_id, outcome).await
    }

    /// Run one process template. Depth is checked before any I/O.
    pub async fn run_process(
        &self,
        process_id: &str,
        inputs: Map<String, Value>,
        ctx: &RunContext,
    ) -> Result<Map<String, Value>, EngineError> {
        if ctx.depth > self.config.max_call_depth {
            return Err(EngineError::DepthExceeded {
                depth: ctx.depth,
                max: self.config.max_call_depth,
            });
        }

        let template = self.load_template(ExecKind::Process, process_id)?;
        let run_id = Uuid::now_v7();
        let log = Mutex::new(RuntimeLog::open(
            self.sink.clone(),
            run_id,
            process_id,
            ExecKind::Process,
            ctx.task_id.clone(),
            ctx.run_id,
            inputs.clone(),
        )?);

        let outcome = self.drive(&template, inputs, &log, &ctx.enter(run_id)).await;
        self.close(&log, process_id, outcome).await
    }

    /// Seed, execute the graph, extract outputs. Shared by task and
    /// process runs; the validator guarantees `execution` is present for
    /// both kinds.
    async fn drive(
        &self,
        template: &Template,
        inputs: Map<String, Value>,
        log: &Mutex<RuntimeLog>,
        ctx: &RunContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let mut space = VariableSpace::seed(template.inputs.as_deref(), &inputs)?;
        let execution = template.execution.as_ref().ok_or_else(|| {
            EngineError::Template(vec![format!(
                "'{}' has no execution graph",
                template.name
            )])
        })?;
        self.execute(execution, &mut space, log, ctx).await?;
        space.extract_outputs(template.outputs.as_deref())
    }

    /// Close a run record with its outcome and pass the outcome through.
    async fn close(
        &self,
        log: &Mutex<RuntimeLog>,
        template_id: &str,
        outcome: Result<Map<String, Value>, EngineError>,
    ) -> Result<Map<String, Value>, EngineError> {
        let mut log = log.lock().await;
        match outcome {
            Ok(outputs) => {
                info!(template_id, run_id = %log.run_id(), "run succeeded");
                log.mark_success(outputs.clone())?;
                Ok(outputs)
            }
            Err(err) => {
                warn!(template_id, run_id = %log.run_id(), error = %err, "run failed");
                log.mark_failed(&err)?;
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Leaf runs
    // -----------------------------------------------------------------------

    /// Run a remote action: validate its contract, then RPC over the
    /// queue pair.
    pub async fn run_action(
        &self,
        action_id: &str,
        inputs: Map<String, Value>,
        ctx: &RunContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let template = self.load_template(ExecKind::Action, action_id)?;
        let effective = effective_inputs(template.inputs.as_deref(), &inputs)?;
        let mut log = RuntimeLog::open(
            self.sink.clone(),
            Uuid::now_v7(),
            action_id,
            ExecKind::Action,
            ctx.task_id.clone(),
            ctx.run_id,
            effective.clone(),
        )?;

        let outcome = match self.call_action(action_id, &effective).await {
            Ok(raw) => check_outputs(template.outputs.as_deref(), raw),
            Err(err) => Err(err),
        };
        close_leaf(&mut log, outcome)
    }

    /// Run a generator through the backend port.
    pub async fn run_generator(
        &self,
        generator_id: &str,
        inputs: Map<String, Value>,
        ctx: &RunContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let template = self.load_template(ExecKind::Generator, generator_id)?;
        let effective = effective_inputs(template.inputs.as_deref(), &inputs)?;
        let mut log = RuntimeLog::open(
            self.sink.clone(),
            Uuid::now_v7(),
            generator_id,
            ExecKind::Generator,
            ctx.task_id.clone(),
            ctx.run_id,
            effective.clone(),
        )?;

        let outcome = match self.generator.generate(generator_id, &effective).await {
            Ok(raw) => check_outputs(template.outputs.as_deref(), raw),
            Err(err) => Err(err),
        };
        close_leaf(&mut log, outcome)
    }

    /// Run a registered tool synchronously.
    pub async fn run_tool(
        &self,
        tool_id: &str,
        inputs: Map<String, Value>,
        ctx: &RunContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let meta = self
            .tools
            .metadata(tool_id)
            .ok_or_else(|| EngineError::TemplateNotFound {
                class: ExecKind::Tool.to_string(),
                id: tool_id.to_string(),
            })?;
        let effective = effective_inputs(Some(meta.inputs.as_slice()), &inputs)?;
        let mut log = RuntimeLog::open(
            self.sink.clone(),
            Uuid::now_v7(),
            tool_id,
            ExecKind::Tool,
            ctx.task_id.clone(),
            ctx.run_id,
            effective.clone(),
        )?;

        let outcome = match self.tools.invoke(tool_id, &effective) {
            Ok(raw) => check_outputs(Some(meta.outputs.as_slice()), raw),
            Err(err) => Err(err),
        };
        close_leaf(&mut log, outcome)
    }
}

// ---------------------------------------------------------------------------
// Contract helpers
// ---------------------------------------------------------------------------

/// Apply a callee's declared input contract: type-check the provided
/// values, fill defaults, reject undeclared keys.
fn effective_inputs(
    declared: Option<&[ParamSpec]>,
    inputs: &Map<String, Value>,
) -> Result<Map<String, Value>, EngineError> {
    Ok(VariableSpace::seed(declared, inputs)?.as_map().clone())
}

/// Check a callee's raw outputs against its declared output contract,
/// keeping exactly the declared keys.
fn check_outputs(
    declared: Option<&[ParamSpec]>,
    raw: Map<String, Value>,
) -> Result<Map<String, Value>, EngineError> {
    let mut space = VariableSpace::default();
    for (key, value) in raw {
        space.insert(key, value);
    }
    space.extract_outputs(declared)
}

fn close_leaf(
    log: &mut RuntimeLog,
    outcome: Result<Map<String, Value>, EngineError>,
) -> Result<Map<String, Value>, EngineError> {
    match outcome {
        Ok(outputs) => {
            log.mark_success(outputs.clone())?;
            Ok(outputs)
        }
        Err(err) => {
            log.mark_failed(&err)?;
            Err(err)
        }
    }
}

#[cfg(test)]
pub(crate) mod testkit;
