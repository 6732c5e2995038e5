//! Engine configuration.
//!
//! Loads batch, retry and submission settings from TOML. Every key is
//! optional; missing sections and keys take their defaults.
//!
//! ```toml
//! [batch]
//! max_batch_size = 500
//!
//! [retry]
//! max_attempts = 5
//! initial_backoff_ms = 200
//!
//! [submit]
//! timeout_secs = 10
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::builder::{BatchBuilder, MAX_BATCH_SIZE};
use crate::executor::{SubmitOptions, Submitter};
use crate::retry::RetryPolicy;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Batch assembly settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Operations per batch; at most the remote limit of 1000.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

/// Submission settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitConfig {
    /// Per-attempt timeout in seconds; 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub submit: SubmitConfig,
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EngineConfig {
    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str, path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.into(),
            source,
        })
    }

    /// Loads configuration from `path`, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "acl-batch: Config file not found, using defaults"
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes the configuration to `path` as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.max_batch_size == 0 || self.batch.max_batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::invalid(format!(
                "max_batch_size must be 1-{}",
                MAX_BATCH_SIZE
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be > 0"));
        }

        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::invalid("multiplier must be >= 1.0"));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::invalid(
                "initial_backoff_ms must not exceed max_backoff_ms",
            ));
        }

        Ok(())
    }

    /// Per-attempt timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.submit.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            retry: self.retry.clone(),
            timeout: self.timeout(),
        }
    }

    pub fn submitter(&self) -> Submitter {
        Submitter::new(self.submit_options())
    }

    pub fn builder(&self) -> BatchBuilder {
        BatchBuilder::new().with_max_batch_size(self.batch.max_batch_size)
    }
}
