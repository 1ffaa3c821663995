//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Server configuration, loaded from a TOML file with sane defaults
/// for a local inference backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the inference backend
    pub backend_url: String,
    /// Port the relay listens on
    pub port: u16,
    /// System prompt offered to new conversations
    pub default_system_prompt: String,
    /// Model preselected for new conversations
    pub default_model: String,
    /// Context window in messages; 0 = unbounded
    pub max_messages_in_context: usize,
    /// Where conversation history lives; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:11434".to_string(),
            port: 3000,
            default_system_prompt: String::new(),
            default_model: String::new(),
            max_messages_in_context: 0,
            data_dir: None,
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roost")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for ROOST_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("ROOST_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from an explicit path, or the default location.
    /// A missing or unreadable file falls back to defaults with a
    /// warning rather than failing startup.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("failed to parse config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("failed to read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Directory holding one JSON document per conversation
    pub fn history_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("roost")
            })
            .join("history")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend_url, "http://localhost:11434");
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_messages_in_context, 0);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let config: Config = toml::from_str("port = 8080\n").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.backend_url, "http://localhost:11434");
    }

    #[test]
    fn test_history_dir_honors_data_dir() {
        let config: Config = toml::from_str("data_dir = \"/tmp/roost-test\"\n").unwrap();
        assert_eq!(
            config.history_dir(),
            PathBuf::from("/tmp/roost-test/history")
        );
    }
}
