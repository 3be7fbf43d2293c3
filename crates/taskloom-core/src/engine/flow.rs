//! Control-flow execution: sequence, select, loop, parallel.

use futures_util::future::join_all;
use serde_json::{Map, Value};
use taskloom_types::template::{Branch, Case, ExecutionSpec, LoopSpec, Step};
use tokio::sync::Mutex;

use crate::condition::{eval_condition, eval_expression};
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
    /// Execute one graph node against the run's space.
    pub(super) async fn execute(
        &self,
        spec: &ExecutionSpec,
        space: &mut VariableSpace,
        log: &Mutex<RuntimeLog>,
        ctx: &RunContext,
    ) -> Result<(), EngineError> {
        match spec {
            ExecutionSpec::Call { call } => self.dispatch(call, space, log, ctx).await,
            ExecutionSpec::Sequence { steps } => self.run_sequence(steps, space, log, ctx).await,
            ExecutionSpec::Select { cases } => self.run_select(cases, space, log, ctx).await,
            ExecutionSpec::Loop(spec) => self.run_loop(spec, space, log, ctx).await,
            ExecutionSpec::Parallel { branches } => {
                self.run_parallel(branches, space, log, ctx).await
            }
        }
    }

    async fn run_sequence(
        &self,
        steps: &[Step],
        space: &mut VariableSpace,
        log: &Mutex<RuntimeLog>,
        ctx: &RunContext,
    ) -> Result<(), EngineError> {
        for step in steps {
            log.lock()
                .await
                .append(format!("step {}: {}", step.order, step.description))?;
            self.dispatch(&step.call, space, log, ctx).await?;
        }
        Ok(())
    }

    /// Cases are evaluated in list order; the first match wins. When a
    /// case carries both forms, the structured condition decides. No
    /// match is a successful no-op.
    async fn run_select(
        &self,
        cases: &[Case],
        space: &mut VariableSpace,
        log: &Mutex<RuntimeLog>,
        ctx: &RunContext,
    ) -> Result<(), EngineError> {
        for (idx, case) in cases.iter().enumerate() {
            let matched = match (&case.condition, &case.expression) {
                (Some(tree), _) => eval_condition(tree, space)?,
                (None, Some(expression)) => eval_expression(expression, space)?,
                (None, None) => false,
            };
            if matched {
                log.lock()
                    .await
                    .append(format!("case {} matched: {}", idx + 1, case.description))?;
                return self.dispatch(&case.call, space, log, ctx).await;
            }
        }
        log.lock().await.append("no case matched; nothing dispatched")?;
        Ok(())
    }

    /// The bound is re-evaluated before every iteration; the per-call
    /// error policy applies to each iteration independently.
    async fn run_loop(
        &self,
        spec: &LoopSpec,
        space: &mut VariableSpace,
        log: &Mutex<RuntimeLog>,
        ctx: &RunContext,
    ) -> Result<(), EngineError> {
        if spec.condition.is_none() && spec.max_iterations.is_none() {
            return Err(EngineError::Condition(
                "loop has neither a condition nor an iteration bound".to_string(),
            ));
        }

        let mut iteration: u64 = 0;
        loop {
            if let Some(max) = spec.max_iterations
                && iteration >= max
            {
                log.lock()
                    .await
                    .append(format!("loop stopped at iteration bound {max}"))?;
                break;
            }
            if let Some(condition) = &spec.condition
                && !eval_condition(condition, space)?
            {
                break;
            }
            iteration += 1;
            log.lock()
                .await
                .append(format!("loop iteration {iteration}"))?;
            self.dispatch(&spec.call, space, log, ctx).await?;
        }
        Ok(())
    }

    /// Branch inputs resolve against the pre-branch space, in order;
    /// invocations run concurrently; outputs bind after the join, in
    /// branch order. Validation guarantees disjoint targets, so binding
    /// order is not observable.
    async fn run_parallel(
        &self,
        branches: &[Branch],
        space: &mut VariableSpace,
        log: &Mutex<RuntimeLog>,
        ctx: &RunContext,
    ) -> Result<(), EngineError> {
        let mut resolved: Vec<Map<String, Value>> = Vec::with_capacity(branches.len());
        for branch in branches {
            resolved.push(space.resolve_inputs(&branch.call.inputs)?);
        }

        log.lock()
            .await
            .append(format!("joining {} parallel branches", branches.len()))?;

        let invocations = branches
            .iter()
            .zip(resolved)
            .map(|(branch, inputs)| self.invoke_with_policy(&branch.call, inputs, log, ctx));
        let results = join_all(invocations).await;

        for (branch, result) in branches.iter().zip(results) {
            if let Some(outputs) = result? {
                space.bind_outputs(&branch.call.outputs, &outputs)?;
            }
        }
        Ok(())
    }
}
