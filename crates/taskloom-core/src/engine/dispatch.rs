//! Call dispatch: resolve inputs, invoke with retry policy, bind
//! outputs.

use std::time::Duration;

use serde_json::{Map, Value};
use taskloom_types::template::{CallKind, CallSpec};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::EngineError;
use crate::port::{GeneratorBackend, MessageQueue};
use crate::runlog::RuntimeLog;
use crate::space::VariableSpace;

use super::{Engine, RunContext};

impl<Q, G> Engine<Q, G>
where
    Q: MessageQueue,
    G: GeneratorBackend,
{
    /// Dispatch one call against the enclosing run's space.
    ///
    /// Input resolution failures are wiring defects and propagate
    /// immediately, before any invocation. A skipped call binds nothing.
    pub(super) async fn dispatch(
        &self,
        call: &CallSpec,
        space: &mut VariableSpace,
        log: &Mutex<RuntimeLog>,
        ctx: &RunContext,
    ) -> Result<(), EngineError> {
        let inputs = space.resolve_inputs(&call.inputs)?;
        match self.invoke_with_policy(call, inputs, log, ctx).await? {
            Some(outputs) => space.bind_outputs(&call.outputs, &outputs),
            None => Ok(()),
        }
    }

    /// The attempt loop. `Ok(None)` means the call failed but its policy
    /// says skip.
    pub(super) async fn invoke_with_policy(
        &self,
        call: &CallSpec,
        inputs: Map<String, Value>,
        log: &Mutex<RuntimeLog>,
        ctx: &RunContext,
    ) -> Result<Option<Map<String, Value>>, EngineError> {
        let policy = &call.error_handling;
        let max_attempts = policy.max_attempts();
        let mut last_error: Option<EngineError> = None;

        for attempt in 1..=max_attempts {
            log.lock().await.append(format!(
                "dispatching {} '{}' (attempt {attempt}/{max_attempts})",
                call.kind, call.id
            ))?;

            match self.invoke_once(call.kind, &call.id, inputs.clone(), ctx).await {
                Ok(outputs) => {
                    log.lock()
                        .await
                        .append(format!("{} '{}' succeeded", call.kind, call.id))?;
                    return Ok(Some(outputs));
                }
                Err(err) if !err.is_retryable() => {
                    log.lock()
                        .await
                        .append(format!("{} '{}' failed fatally: {err}", call.kind, call.id))?;
                    return Err(err);
                }
                Err(err) => {
                    log.lock().await.append(format!(
                        "{} '{}' attempt {attempt}/{max_attempts} failed: {err}",
                        call.kind, call.id
                    ))?;
                    last_error = Some(err);
                    if attempt < max_attempts {
                        debug!(
                            id = %call.id,
                            interval_secs = policy.retry.interval,
                            "sleeping before retry"
                        );
                        tokio::time::sleep(Duration::from_secs(policy.retry.interval)).await;
                    }
                }
            }
        }

        let err = last_error
            .unwrap_or_else(|| EngineError::Runtime("call was never attempted".to_string()));
        match policy.strategy {
            taskloom_types::template::ErrorStrategy::Skip => {
                log.lock().await.append(format!(
                    "{} '{}' exhausted retries; skipping per policy",
                    call.kind, call.id
                ))?;
                Ok(None)
            }
            taskloom_types::template::ErrorStrategy::Abort => Err(err),
        }
    }

    /// One attempt at one callee. Every attempt opens its own run record
    /// under a fresh run id.
    async fn invoke_once(
        &self,
        kind: CallKind,
        id: &str,
        inputs: Map<String, Value>,
        ctx: &RunContext,
    ) -> Result<Map<String, Value>, EngineError> {
        match kind {
            CallKind::Process => {
                let child = ctx.deepen();
                Box::pin(self.run_process(id, inputs, &child)).await
            }
            CallKind::Action => self.run_action(id, inputs, ctx).await,
            CallKind::Generator => self.run_generator(id, inputs, ctx).await,
            CallKind::Tool => self.run_tool(id, inputs, ctx).await,
        }
    }
}
