/// Application configuration
///
/// Read from the user's config directory:
/// - Linux: ~/.config/nutriva/config.json
/// - macOS: ~/Library/Application Support/nutriva/config.json
/// - Windows: %APPDATA%\nutriva\config.json
///
/// Every field has a default, so a missing file is not an error.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the detection service
    pub api_base: String,
    /// Mirror camera frames horizontally, in the live preview and in captures
    pub mirror_capture: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            mirror_capture: true,
        }
    }
}

impl AppConfig {
    /// Load from the default location, falling back to defaults on any problem
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::debug!("no config directory, using defaults");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(Some(config)) => {
                tracing::info!(path = %path.display(), "config loaded");
                config
            }
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring config file, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; `Ok(None)` when the file does not exist
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json).map(Some)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Get the path where the config file should be stored
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("nutriva");
        path.push("config.json");
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api_base, "http://127.0.0.1:8000");
        assert!(config.mirror_capture);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = AppConfig::from_json(r#"{"mirror_capture": false}"#).unwrap();
        assert!(!config.mirror_capture);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        assert!(matches!(AppConfig::from_json("{"), Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_none() {
        let loaded = AppConfig::load_from(Path::new("/nonexistent/nutriva/config.json")).unwrap();
        assert!(loaded.is_none());
    }
}
