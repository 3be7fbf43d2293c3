//! Filesystem template store.
//!
//! Templates live under `{template_dir}/{kind}/`, one JSON document per
//! file. Lookup is by filename prefix: the first file (in name order)
//! whose name starts with the template id wins, so authors can keep a
//! human-readable suffix like `process_planning0001_weather.json`.

use std::path::PathBuf;

use serde_json::Value;
use taskloom_core::error::EngineError;
use taskloom_core::port::TemplateSource;
use taskloom_types::template::ExecKind;
use tracing::debug;

pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The first file under `{root}/{kind}/` whose name starts with `id`.
    fn find(&self, kind: ExecKind, id: &str) -> Result<Option<PathBuf>, EngineError> {
        let dir = self.root.join(kind.as_str());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let mut names: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .find(|name| name.starts_with(id))
            .map(|name| dir.join(name)))
    }
}

impl TemplateSource for FsTemplateSource {
    fn fetch(&self, kind: ExecKind, id: &str) -> Result<Value, EngineError> {
        let path = self
            .find(kind, id)?
            .ok_or_else(|| EngineError::TemplateNotFound {
                class: kind.to_string(),
                id: id.to_string(),
            })?;
        debug!(kind = %kind, id, path = %path.display(), "loading template");
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
