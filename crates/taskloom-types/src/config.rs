//! Engine configuration.
//!
//! Deserialized from `config.toml` in the data directory by the infra
//! layer; every field has a default so a missing or partial file still
//! yields a working engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory of the template store (one subdirectory per class).
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,
    /// Root directory of the run-log store.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Seconds to wait for an action response before surfacing a timeout.
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,
    /// Milliseconds between response-queue polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum nesting depth of process-calling-process.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
            log_dir: default_log_dir(),
            action_timeout_secs: default_action_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_call_depth: default_max_call_depth(),
        }
    }
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("prompts")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("log/run_records")
}

fn default_action_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_call_depth() -> u32 {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.action_timeout_secs, 30);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.max_call_depth, 8);
        assert_eq!(config.template_dir, PathBuf::from("prompts"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
template_dir = "/srv/loom/templates"
action_timeout_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.template_dir, PathBuf::from("/srv/loom/templates"));
        assert_eq!(config.action_timeout_secs, 5);
        assert_eq!(config.max_call_depth, 8);
        assert_eq!(config.log_dir, PathBuf::from("log/run_records"));
    }
}
