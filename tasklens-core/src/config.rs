//! Configuration for TaskLens

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Root directory for TaskLens state (`~/.tasklens`, or `./.tasklens` without a home)
pub fn default_home() -> PathBuf {
    dirs::home_dir()
        .map(|mut p| {
            p.push(".tasklens");
            p
        })
        .unwrap_or_else(|| PathBuf::from("./.tasklens"))
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskLensConfig {
    /// JSON file holding the task list
    pub data_file: PathBuf,
    /// Run image analysis when a proof photo is attached
    pub vision_enabled: bool,
    /// Store attached photos inline as data URLs instead of linking the file
    pub embed_images: bool,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for TaskLensConfig {
    fn default() -> Self {
        Self {
            data_file: default_home().join("tasks.json"),
            vision_enabled: true,
            embed_images: true,
            log_level: "warn".to_string(),
        }
    }
}

impl TaskLensConfig {
    /// Load configuration from a JSON, TOML or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a string, trying JSON, then TOML, then YAML
    pub fn from_str(content: &str) -> Result<Self> {
        if let Ok(config) = serde_json::from_str::<TaskLensConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = toml::from_str::<TaskLensConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = serde_yaml::from_str::<TaskLensConfig>(content) {
            return Ok(config);
        }

        Err(Error::Configuration("Unknown configuration format".to_string()))
    }

    /// Default configuration with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `TASKLENS_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(data_file) = std::env::var("TASKLENS_DATA_FILE") {
            if !data_file.trim().is_empty() {
                self.data_file = PathBuf::from(data_file);
            }
        }

        if let Ok(log_level) = std::env::var("TASKLENS_LOG_LEVEL") {
            self.log_level = log_level.to_lowercase();
        }

        if let Ok(vision) = std::env::var("TASKLENS_VISION") {
            match vision.to_lowercase().as_str() {
                "0" | "false" | "off" => self.vision_enabled = false,
                "1" | "true" | "on" => self.vision_enabled = true,
                _ => {}
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.data_file.as_os_str().is_empty() {
            return Err(Error::Configuration("data_file must not be empty".to_string()));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::Configuration(format!(
                "Unknown log level '{}' (expected one of {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TaskLensConfig::default();
        assert!(config.data_file.ends_with("tasks.json"));
        assert!(config.vision_enabled);
        assert!(config.embed_images);
        assert_eq!(config.log_level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config = TaskLensConfig::from_str(
            r#"{"data_file": "/tmp/tasks.json", "vision_enabled": false}"#,
        )
        .unwrap();
        assert_eq!(config.data_file, PathBuf::from("/tmp/tasks.json"));
        assert!(!config.vision_enabled);
        // Missing fields fall back to defaults
        assert!(config.embed_images);
    }

    #[test]
    fn test_config_from_toml() {
        let config = TaskLensConfig::from_str("log_level = \"debug\"\nembed_images = false\n").unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(!config.embed_images);
    }

    #[test]
    fn test_config_from_yaml() {
        let config = TaskLensConfig::from_str("log_level: info\nvision_enabled: false\n").unwrap();
        assert_eq!(config.log_level, "info");
        assert!(!config.vision_enabled);
    }

    #[test]
    fn test_config_unknown_format() {
        assert!(TaskLensConfig::from_str("log_level = [").is_err());
    }

    #[test]
    fn test_config_validation_log_level() {
        let mut config = TaskLensConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_data_file() {
        let mut config = TaskLensConfig::default();
        config.data_file = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = TaskLensConfig::from_file("/nonexistent/tasklens.toml");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
