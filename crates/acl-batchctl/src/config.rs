//! acl-batchctl configuration.
//!
//! The engine sections (`[batch]`, `[retry]`, `[submit]`) sit at the top
//! level next to `[api]`, which describes how to reach the remote store.

use std::fs;
use std::path::Path;

use acl_batch::{ConfigError, EngineConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/acl-batch/acl-batchctl.toml";

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; request paths are appended to it.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Header the token is sent in.
    #[serde(default = "default_auth_header")]
    pub auth_header: String,

    /// Page size for listing calls.
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CtlConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(flatten)]
    pub engine: EngineConfig,
}

fn default_endpoint() -> String {
    "https://api.fastly.com".to_string()
}

fn default_token_env() -> String {
    "ACL_BATCH_API_TOKEN".to_string()
}

fn default_auth_header() -> String {
    "Fastly-Key".to_string()
}

fn default_per_page() -> usize {
    acl_batch::DEFAULT_PER_PAGE
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token_env: default_token_env(),
            auth_header: default_auth_header(),
            per_page: default_per_page(),
        }
    }
}

impl ApiConfig {
    /// Reads the API token from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

impl CtlConfig {
    /// Loads configuration from `path`, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "acl-batchctl: Config file not found, using defaults"
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;

        if !self.api.endpoint.starts_with("http://") && !self.api.endpoint.starts_with("https://") {
            return Err(ConfigError::invalid("endpoint must be an http(s) URL"));
        }

        if self.api.auth_header.is_empty() {
            return Err(ConfigError::invalid("auth_header must not be empty"));
        }

        if self.api.per_page == 0 {
            return Err(ConfigError::invalid("per_page must be > 0"));
        }

        Ok(())
    }
}
