//! Configuration file handling for neon-dream.
//!
//! Loads configuration from `~/.config/neon-dream/config.toml` or a custom
//! path. Everything has a sensible default; the file only exists to
//! override the API endpoint, the model ids, or the video polling limits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::gemini::{PollPolicy, DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

/// Overrides for the provider endpoint and model identifiers.
#[derive(Debug, Deserialize, Default)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub video_model: Option<String>,
}

/// Video job polling limits.
#[derive(Debug, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_polls: default_max_polls(),
        }
    }
}

impl VideoConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_secs(self.poll_interval_secs), self.max_polls)
    }
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_max_polls() -> u32 {
    DEFAULT_MAX_POLLS
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let config: Config =
                toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("neon-dream").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/neon-dream/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert!(config.api.base_url.is_none());
        assert_eq!(config.video.poll_interval_secs, 5);
        assert_eq!(config.video.max_polls, DEFAULT_MAX_POLLS);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nbase_url = \"http://localhost:8080\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.api.base_url.as_deref(), Some("http://localhost:8080"));
        assert!(config.api.video_model.is_none());
        assert_eq!(config.video.max_polls, DEFAULT_MAX_POLLS);
    }

    #[test]
    fn test_video_section_overrides_poll_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[video]\npoll_interval_secs = 2\nmax_polls = 30\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        let policy = config.video.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.max_polls, 30);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not valid toml [[[").unwrap();

        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_default_path_points_at_config_toml() {
        let path = default_path();
        assert!(path.to_string_lossy().contains("neon-dream"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
