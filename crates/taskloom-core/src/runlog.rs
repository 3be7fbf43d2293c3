//! The live runtime log of one run.
//!
//! Wraps a [`RunRecord`] plus the sink that persists it. The record is
//! append-only while the run is live: every mutation re-persists the
//! whole record so the sink always holds the latest state, and a
//! crashed run is recognizable by a record stuck in `running`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use taskloom_types::runlog::{RunRecord, RunStatus, TimestampedMessage};
use taskloom_types::template::ExecKind;
use uuid::Uuid;

use crate::error::EngineError;
use crate::port::RunLogSink;

/// One run's record and its persistence sink.
pub struct RuntimeLog {
    record: RunRecord,
    sink: Arc<dyn RunLogSink>,
}

impl RuntimeLog {
    /// Open and immediately persist a new `running` record.
    pub fn open(
        sink: Arc<dyn RunLogSink>,
        run_id: Uuid,
        template_id: impl Into<String>,
        class: ExecKind,
        task_id: Option<String>,
        parent_run_id: Option<Uuid>,
        inputs: Map<String, Value>,
    ) -> Result<Self, EngineError> {
        let record = RunRecord::open(run_id, template_id, class, task_id, parent_run_id, inputs);
        sink.persist(&record)?;
        Ok(Self { record, sink })
    }

    pub fn run_id(&self) -> Uuid {
        self.record.run_id
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Append one timestamped event and re-persist.
    pub fn append(&mut self, message: impl Into<String>) -> Result<(), EngineError> {
        self.record.records.push(TimestampedMessage {
            timestamp: Utc::now(),
            message: message.into(),
        });
        self.sink.persist(&self.record)
    }

    /// Close the record as successful, storing the produced outputs.
    pub fn mark_success(&mut self, outputs: Map<String, Value>) -> Result<(), EngineError> {
        self.record.status = RunStatus::Success;
        self.record.end_time = Some(Utc::now());
        self.record.outputs = outputs;
        self.sink.persist(&self.record)
    }

    /// Close the record as failed, storing the failure cause.
    pub fn mark_failed(&mut self, error: &EngineError) -> Result<(), EngineError> {
        self.record.status = RunStatus::Failed;
        self.record.end_time = Some(Utc::now());
        self.record.error_message = Some(error.to_string());
        self.sink.persist(&self.record)
    }
}
