//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/flowscope/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/flowscope/` (~/.config/flowscope/)
//! - State/Logs: `$XDG_STATE_HOME/flowscope/` (~/.local/state/flowscope/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Placeholder substituted with the process instance id in history paths.
pub const INSTANCE_PLACEHOLDER: &str = "{instanceId}";
/// Placeholder substituted with the process definition id in graph paths.
pub const DEFINITION_PLACEHOLDER: &str = "{definitionId}";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Workflow engine API connection
    #[serde(default)]
    pub engine: EngineConfig,

    /// Replay/caching behaviour
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Workflow engine REST API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Base URL of the engine REST API (e.g., `http://localhost:8080/engine-rest`)
    pub base_url: Option<String>,

    /// Basic auth user name
    pub username: Option<String>,

    /// Basic auth password
    pub password: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient failures
    #[serde(default = "default_engine_max_retries")]
    pub max_retries: usize,

    /// Path of the historic-activity list, relative to `base_url`
    #[serde(default = "default_activity_history_path")]
    pub activity_history_path: String,

    /// Path of the task-centric process history list, relative to `base_url`
    #[serde(default = "default_task_history_path")]
    pub task_history_path: String,

    /// Path of the structural process graph document, relative to `base_url`
    #[serde(default = "default_definition_graph_path")]
    pub definition_graph_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            timeout_secs: default_engine_timeout(),
            max_retries: default_engine_max_retries(),
            activity_history_path: default_activity_history_path(),
            task_history_path: default_task_history_path(),
            definition_graph_path: default_definition_graph_path(),
        }
    }
}

impl EngineConfig {
    /// Check if the engine connection is configured
    pub fn is_ready(&self) -> bool {
        self.base_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.is_ready() {
            return Err(Error::Config(
                "engine.base_url is required to fetch history".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "engine.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(Error::Config(
                "engine.username and engine.password must be set together".to_string(),
            ));
        }
        for (key, path, placeholder) in [
            (
                "engine.activity_history_path",
                &self.activity_history_path,
                INSTANCE_PLACEHOLDER,
            ),
            (
                "engine.task_history_path",
                &self.task_history_path,
                INSTANCE_PLACEHOLDER,
            ),
            (
                "engine.definition_graph_path",
                &self.definition_graph_path,
                DEFINITION_PLACEHOLDER,
            ),
        ] {
            if !path.contains(placeholder) {
                return Err(Error::Config(format!(
                    "{} must contain the {} placeholder",
                    key, placeholder
                )));
            }
        }
        Ok(())
    }
}

fn default_engine_timeout() -> u64 {
    30
}

fn default_engine_max_retries() -> usize {
    3
}

fn default_activity_history_path() -> String {
    "/history/process-instances/{instanceId}/activities".to_string()
}

fn default_task_history_path() -> String {
    "/history/process-instances/{instanceId}/tasks".to_string()
}

fn default_definition_graph_path() -> String {
    "/repository/process-definitions/{definitionId}/graph".to_string()
}

/// Replay configuration
#[derive(Debug, Deserialize)]
pub struct ReplayConfig {
    /// How many process graphs the definition cache keeps
    #[serde(default = "default_definition_cache_capacity")]
    pub definition_cache_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            definition_cache_capacity: default_definition_cache_capacity(),
        }
    }
}

fn default_definition_cache_capacity() -> usize {
    32
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/flowscope/config.toml` (~/.config/flowscope/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("flowscope").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/flowscope/` (~/.local/state/flowscope/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("flowscope")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("flowscope.log")
    }
}
