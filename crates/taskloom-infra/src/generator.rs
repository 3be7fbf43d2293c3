//! Generator backends.
//!
//! The engine treats a generator as an opaque inputs-to-outputs port.
//! These two implementations cover local runs and tests; a real model
//! endpoint implements the same [`GeneratorBackend`] port.

use std::collections::HashMap;

use serde_json::{Map, Value};
use taskloom_core::error::EngineError;
use taskloom_core::port::GeneratorBackend;
use tracing::debug;

/// Produces no outputs, whatever it is asked. Only usable with
/// generator templates that declare no outputs.
#[derive(Default)]
pub struct NullGenerator;

impl GeneratorBackend for NullGenerator {
    async fn generate(
        &self,
        id: &str,
        _inputs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, EngineError> {
        debug!(id, "null generator produced no outputs");
        Ok(Map::new())
    }
}

/// Replays a fixture outputs map per generator id.
#[derive(Default)]
pub struct ScriptedGenerator {
    fixtures: HashMap<String, Map<String, Value>>,
}

impl ScriptedGenerator {
    pub fn with(mut self, id: &str, outputs: Map<String, Value>) -> Self {
        self.fixtures.insert(id.to_string(), outputs);
        self
    }
}

impl GeneratorBackend for ScriptedGenerator {
    async fn generate(
        &self,
        id: &str,
        _inputs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, EngineError> {
        self.fixtures
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::Runtime(format!("no scripted outputs for generator '{id}'")))
    }
}
