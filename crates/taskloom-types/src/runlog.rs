//! Run-log record types.
//!
//! One `RunRecord` exists per run id; a run id is freshly generated for
//! every invocation of an executable, not per template. The record is
//! append-only while the run is live and closed exactly once with a
//! terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::template::ExecKind;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

// ---------------------------------------------------------------------------
// RunRecord
// ---------------------------------------------------------------------------

/// The auditable trace of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Fresh UUIDv7 per invocation.
    pub run_id: Uuid,
    /// The enclosing task's id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// The run that dispatched this one, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<Uuid>,
    /// The template being executed.
    pub template_id: String,
    /// Which executable kind ran.
    pub class: ExecKind,
    /// Current status.
    pub status: RunStatus,
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// The inputs the run was invoked with.
    pub inputs: Map<String, Value>,
    /// The outputs the run produced (empty until success).
    pub outputs: Map<String, Value>,
    /// Failure cause, when status is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Timestamped dispatch/retry/failure events, in order.
    pub records: Vec<TimestampedMessage>,
}

/// One appended run event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedMessage {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl RunRecord {
    /// Open a new record in `running` state.
    pub fn open(
        run_id: Uuid,
        template_id: impl Into<String>,
        class: ExecKind,
        task_id: Option<String>,
        parent_run_id: Option<Uuid>,
        inputs: Map<String, Value>,
    ) -> Self {
        Self {
            run_id,
            task_id,
            parent_run_id,
            template_id: template_id.into(),
            class,
            status: RunStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            inputs,
            outputs: Map::new(),
            error_message: None,
            records: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
