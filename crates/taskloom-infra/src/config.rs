//! Engine configuration loader.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`EngineConfig`]. Falls back to defaults when the file is missing or
//! malformed; a broken config file must not keep the engine from
//! starting.

use std::path::Path;

use taskloom_types::config::EngineConfig;

/// Load engine configuration from `{data_dir}/config.toml`.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_engine_config(dir.path()).await;
        assert_eq!(config.action_timeout_secs, 30);
    }

    #[tokio::test]
    async fn malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "not = [toml").unwrap();
        let config = load_engine_config(dir.path()).await;
        assert_eq!(config.max_call_depth, 8);
    }

    #[tokio::test]
    async fn partial_file_overrides_only_named_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "action_timeout_secs = 5\npoll_interval_ms = 50\n",
        )
        .unwrap();
        let config = load_engine_config(dir.path()).await;
        assert_eq!(config.action_timeout_secs, 5);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.max_call_depth, 8);
    }
}
