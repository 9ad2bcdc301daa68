//! Run configuration
//!
//! Values are layered: built-in defaults, then a TOML file, then
//! `DISTMATVEC_*` environment variables. CLI flags are applied last by the
//! binary through [`MatvecConfig::apply_overrides`].

use crate::error::{MatvecError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "distmatvec.toml";

/// How the result vector is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `{ 1, 2, 6 }`
    #[default]
    Plain,
    /// `[1,2,6]`
    Json,
    /// One value per line
    Lines,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatvecConfig {
    /// Worker count, excluding the coordinator
    pub workers: usize,
    pub vector_path: PathBuf,
    pub matrix_path: PathBuf,
    /// Per-exchange deadline; unset means wait indefinitely
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    /// Dispatched messages allowed in flight per link
    pub channel_capacity: usize,
    pub log_level: String,
    pub output: OutputFormat,
}

impl Default for MatvecConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            vector_path: PathBuf::from("vector.txt"),
            matrix_path: PathBuf::from("matrix.txt"),
            timeout: None,
            channel_capacity: 16,
            log_level: "info".to_string(),
            output: OutputFormat::Plain,
        }
    }
}

/// Command-line values that take precedence over every other layer
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workers: Option<usize>,
    pub vector_path: Option<PathBuf>,
    pub matrix_path: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub output: Option<OutputFormat>,
}

impl MatvecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    /// Load defaults, then `explicit` (which must exist) or the default
    /// config file if present, then the environment.
    pub async fn load(explicit: Option<&Path>, working_dir: &Path) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::read_file(path).await?,
            None => {
                let candidate = working_dir.join(DEFAULT_CONFIG_FILE);
                if candidate.exists() {
                    Self::read_file(&candidate).await?
                } else {
                    Self::default()
                }
            }
        };

        config.merge_env_vars();
        Ok(config)
    }

    async fn read_file(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env_with(|key| std::env::var(key).ok());
    }

    /// Apply `DISTMATVEC_*` values from `lookup`; unparsable values are
    /// ignored with a warning.
    pub fn merge_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(workers) = lookup("DISTMATVEC_WORKERS") {
            match workers.parse::<usize>() {
                Ok(value) => self.workers = value,
                Err(_) => tracing::warn!("Ignoring DISTMATVEC_WORKERS={workers}"),
            }
        }

        if let Some(timeout) = lookup("DISTMATVEC_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.timeout = Some(Duration::from_secs(secs)),
                Err(_) => tracing::warn!("Ignoring DISTMATVEC_TIMEOUT_SECS={timeout}"),
            }
        }

        if let Some(log_level) = lookup("DISTMATVEC_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if let Some(path) = overrides.vector_path {
            self.vector_path = path;
        }
        if let Some(path) = overrides.matrix_path {
            self.matrix_path = path;
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = Some(timeout);
        }
        if let Some(output) = overrides.output {
            self.output = output;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(MatvecError::Config(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(MatvecError::Config(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
