use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_embedder() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_parallel() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

/// Run settings, loadable from YAML. CLI flags override individual fields;
/// everything has a workable default so the file is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedder")]
    pub embedder: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_parallel")]
    pub parallel: usize,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Fixed table top-K; unset means per-tier defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            model: default_model(),
            provider: default_provider(),
            embedder: default_embedder(),
            embedding_model: default_embedding_model(),
            parallel: default_parallel(),
            timeout_seconds: default_timeout(),
            top_k: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<RunConfig, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

        let mut ignored_keys = std::collections::BTreeSet::new();
        let deserializer = serde_yaml::Deserializer::from_str(&raw);
        let cfg: RunConfig = serde_ignored::deserialize(deserializer, |path| {
            ignored_keys.insert(path.to_string());
        })
        .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

        if !ignored_keys.is_empty() {
            tracing::warn!(keys = ?ignored_keys, "ignored unknown config fields");
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel == 0 {
            return Err(ConfigError("parallel must be at least 1".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError("timeout_seconds must be at least 1".into()));
        }
        if let Some(0) = self.top_k {
            return Err(ConfigError("top_k must be at least 1".into()));
        }
        Ok(())
    }
}
