//! Configuration handling for wpsched
//!
//! Configuration is stored in `wpsched.toml` (project, found by walking up
//! from the current directory) and `~/.config/wpsched/config.toml` (global).
//! Project values override global ones table by table.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DEFAULT_ESTIMATED_HOURS;
use crate::engine::CommandEngine;
use crate::planner::Planner;

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "wpsched.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Planning settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Estimate for definitions without one (hours)
    pub default_estimated_hours: f64,

    /// Infer dependencies from titles and descriptions
    pub detect_dependencies: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_estimated_hours: DEFAULT_ESTIMATED_HOURS,
            detect_dependencies: true,
        }
    }
}

/// Execution settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Run parallel groups concurrently
    pub parallel: bool,

    /// Upper bound on workers per group
    pub max_workers: usize,

    /// Pause used by the simulated engine (milliseconds)
    pub simulated_delay_ms: u64,

    /// Skip packages whose dependencies failed
    pub skip_dependents_on_failure: bool,

    /// Kill commands running longer than this (seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,

    /// Shell used to run commands
    pub shell: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_workers: 4,
            simulated_delay_ms: 100,
            skip_dependents_on_failure: false,
            command_timeout_secs: None,
            shell: "sh".to_string(),
        }
    }
}

impl ExecutionConfig {
    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    pub planner: PlannerConfig,

    pub execution: ExecutionConfig,

    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let mut config = Self::load_global()?;
        if let Some(path) = Self::find_project_config() {
            config = config.overlay(&path)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from an explicit file, on top of the global config
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = Self::load_global()?.overlay(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "wpsched", "wpsched").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global() -> Result<Self> {
        let config_path = match Self::global_config_dir() {
            Some(dir) => dir.join("config.toml"),
            None => return Ok(Self::default()),
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::default().overlay(&config_path)
    }

    /// Applies the tables present in `path` on top of `self`
    fn overlay(self, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let table: toml::Table = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        let mut merged = match toml::Value::try_from(&self).context("Failed to serialize config")? {
            toml::Value::Table(merged) => merged,
            _ => return Err(ConfigError::Invalid("config is not a table".to_string()).into()),
        };
        for (key, value) in table {
            match (merged.get_mut(&key), value) {
                (Some(toml::Value::Table(base)), toml::Value::Table(over)) => base.extend(over),
                (_, value) => {
                    merged.insert(key, value);
                }
            }
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Finds `wpsched.toml` in the current directory or any parent
    pub fn find_project_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let candidate = current.join(PROJECT_CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let hours = self.planner.default_estimated_hours;
        if !hours.is_finite() || hours < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "planner.default_estimated_hours must be a non-negative number, got {}",
                hours
            )));
        }
        if self.execution.shell.trim().is_empty() {
            return Err(ConfigError::Invalid("execution.shell must not be empty".to_string()));
        }
        Ok(())
    }

    /// Builds a planner with the simulated engine
    pub fn planner(&self) -> Planner {
        Planner::new()
            .with_default_estimate(self.planner.default_estimated_hours)
            .detect_dependencies(self.planner.detect_dependencies)
            .skip_dependents_on_failure(self.execution.skip_dependents_on_failure)
            .with_simulated_delay(self.execution.simulated_delay())
    }

    /// Builds a command engine with the configured shell and timeout
    pub fn command_engine(&self, definitions: &[crate::domain::WorkPackageDefinition]) -> CommandEngine {
        CommandEngine::from_definitions(self.execution.shell.clone(), definitions)
            .with_timeout(self.execution.command_timeout())
    }
}
