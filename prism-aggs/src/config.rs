//! Configuration for the aggregation model
//!
//! ```toml
//! [datasource]
//! es_version = 70
//! time_field = "@timestamp"
//! time_interval = "10s"
//!
//! [editor]
//! prune_on_type_change = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub datasource: DatasourceConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

/// Options of the Elasticsearch datasource the queries target
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatasourceConfig {
    /// Backend version; gates which aggregation types are offered
    #[serde(default = "default_es_version")]
    pub es_version: u32,
    #[serde(default = "default_time_field")]
    pub time_field: String,
    /// Index name pattern interval (Daily, Weekly, ...), if any
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default = "default_time_interval")]
    pub time_interval: String,
    #[serde(default)]
    pub max_concurrent_shard_requests: Option<u32>,
    #[serde(default)]
    pub log_message_field: Option<String>,
    #[serde(default)]
    pub log_level_field: Option<String>,
}

fn default_es_version() -> u32 {
    70
}

fn default_time_field() -> String {
    "@timestamp".to_string()
}

fn default_time_interval() -> String {
    "10s".to_string()
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            es_version: default_es_version(),
            time_field: default_time_field(),
            interval: None,
            time_interval: default_time_interval(),
            max_concurrent_shard_requests: None,
            log_message_field: None,
            log_level_field: None,
        }
    }
}

/// Behaviour of the state-transition engines
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EditorConfig {
    /// Drop members that become illegal when an aggregation's type changes
    #[serde(default)]
    pub prune_on_type_change: bool,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse aggregation config")
    }

    /// Load config from `path`, or the defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.datasource.es_version, 70);
        assert_eq!(config.datasource.time_field, "@timestamp");
        assert!(!config.editor.prune_on_type_change);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
[datasource]
es_version = 56
log_message_field = "message"

[editor]
prune_on_type_change = true
"#,
        )
        .unwrap();
        assert_eq!(config.datasource.es_version, 56);
        assert_eq!(config.datasource.time_interval, "10s");
        assert_eq!(config.datasource.log_message_field.as_deref(), Some("message"));
        assert!(config.editor.prune_on_type_change);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml_str("[datasource]\nes_version = \"seven\"").is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf").join("aggs.toml");
        let mut config = Config::default();
        config.datasource.es_version = 2;
        config.datasource.max_concurrent_shard_requests = Some(5);
        config.save(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
