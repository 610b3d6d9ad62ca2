//! Configuration structures and loading logic.

use crate::api::DEFAULT_USER_AGENT;
use crate::config::modes::VideoBackend;
use crate::download::RetryPolicy;
use crate::error::{Error, Result};
use crate::pipeline::PipelineSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub options: OptionsConfig,
}

/// Timeline API credentials and request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key sent as `x-rapidapi-key`.
    #[serde(default)]
    pub api_key: String,

    /// API host, optionally with scheme (`https://` assumed).
    #[serde(default)]
    pub api_host: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Entries requested per timeline page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Download options configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Base directory for downloads.
    #[serde(default)]
    pub output_directory: Option<PathBuf>,

    /// Maximum number of concurrent downloads.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Total attempts per request, first try included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any backoff delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Randomize backoff delays.
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// How videos are materialized.
    #[serde(default)]
    pub video_backend: VideoBackend,

    /// Stop discovering after this many new media items.
    #[serde(default)]
    pub max_items: Option<u64>,

    /// Continue from the cursor saved by the previous run.
    #[serde(default = "default_true")]
    pub resume: bool,

    /// Whether to show download progress.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_host: String::new(),
            user_agent: default_user_agent(),
            page_size: default_page_size(),
        }
    }
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            output_directory: None,
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
            video_backend: VideoBackend::default(),
            max_items: None,
            resume: true,
            show_progress: true,
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_page_size() -> u32 {
    20
}

fn default_max_concurrency() -> usize {
    crate::download::DEFAULT_MAX_CONCURRENCY
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one from config.example.toml",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the effective output directory (`./medias` by default).
    pub fn output_directory(&self) -> PathBuf {
        self.options
            .output_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("medias"))
    }

    /// Retry policy shared by pagination and downloads.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.options.max_retries,
            base_delay: Duration::from_millis(self.options.base_delay_ms),
            max_delay: Duration::from_millis(self.options.max_delay_ms),
            jitter: self.options.jitter,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            output_root: self.output_directory(),
            max_concurrency: self.options.max_concurrency,
            retry: self.retry_policy(),
            max_items: self.options.max_items,
            resume: self.options.resume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.options.max_concurrency, 4);
        assert_eq!(config.options.max_retries, 3);
        assert_eq!(config.options.video_backend, VideoBackend::YtDlp);
        assert!(config.options.resume);
        assert_eq!(config.api.page_size, 20);
        assert_eq!(config.output_directory(), PathBuf::from("medias"));
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [api]
            api_key = "k"
            api_host = "timeline.example.com"

            [options]
            max_concurrency = 8
            video_backend = "http"
            base_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.api.api_key, "k");
        assert_eq!(config.options.max_concurrency, 8);
        assert_eq!(config.options.video_backend, VideoBackend::Http);

        let policy = config.retry_policy();
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.api.api_key = "key".into();
        config.options.max_items = Some(50);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.api.api_key, "key");
        assert_eq!(loaded.options.max_items, Some(50));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
