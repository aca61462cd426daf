//! Daemon configuration file.

use std::path::Path;

use anyhow::Context;
use openpedal_engine::PipelineConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level daemon configuration, stored as JSON.
///
/// Every field has a default, so a config file only carries the keys it
/// overrides and a missing file means "run with defaults".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Default log filter, overridable with `RUST_LOG`.
    pub log_filter: String,
    /// Pipeline tunables, passed through to the engine.
    pub pipeline: PipelineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_filter: "openpedal=info,pedald=info,warn".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load a config file, or defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files or malformed JSON; a missing file is not
    /// an error.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!(?path, "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file: {path:?}"))?;
        serde_json::from_str(&text).with_context(|| format!("malformed config file: {path:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let config = ServiceConfig::load(&dir.path().join("nope.json"))
            .await
            .expect("defaults");
        assert_eq!(config.pipeline.sample_rate_hz, 180);
    }

    #[tokio::test]
    async fn test_partial_file_overrides_only_named_keys() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("pedald.json");
        tokio::fs::write(&path, r#"{"pipeline": {"sample_rate_hz": 120}}"#)
            .await
            .expect("write config");

        let config = ServiceConfig::load(&path).await.expect("loads");
        assert_eq!(config.pipeline.sample_rate_hz, 120);
        assert_eq!(config.pipeline.emit_rate_hz, 180);
        assert!(config.log_filter.contains("openpedal"));
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("pedald.json");
        tokio::fs::write(&path, "{not json").await.expect("write config");
        assert!(ServiceConfig::load(&path).await.is_err());
    }
}
