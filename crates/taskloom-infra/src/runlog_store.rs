//! Filesystem run-log store.
//!
//! One JSON file per run: `{log_dir}/{task_id or "#"}/{run_id}.json`.
//! The `#` bucket collects runs invoked outside any task. Every persist
//! replaces the whole document, so the file always holds the record's
//! latest state.

use std::path::PathBuf;

use taskloom_core::error::EngineError;
use taskloom_core::port::RunLogSink;
use taskloom_types::runlog::RunRecord;

/// Directory name for runs without an enclosing task.
const UNTASKED_BUCKET: &str = "#";

pub struct FsRunLogSink {
    root: PathBuf,
}

impl FsRunLogSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, record: &RunRecord) -> PathBuf {
        let bucket = record.task_id.as_deref().unwrap_or(UNTASKED_BUCKET);
        self.root.join(bucket).join(format!("{}.json", record.run_id))
    }
}

impl RunLogSink for FsRunLogSink {
    fn persist(&self, record: &RunRecord) -> Result<(), EngineError> {
        let path = self.path_for(record);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}
