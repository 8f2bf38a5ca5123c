use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ids::MIN_ID_BYTES;
use crate::repository::{DEFAULT_MAX_ID_ATTEMPTS, RawAccess, RepositoryOptions};
use crate::validation::MAX_CONTENT_CHARS;

/// Prefix for environment overrides, e.g. `SCRIPTBIN_PORT=8080`.
pub const ENV_PREFIX: &str = "SCRIPTBIN_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Configuration validation failed: {field} - {reason}")]
    Validation { field: &'static str, reason: String },
}

/// Configuration for the scriptbin server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_content_chars: usize,
    /// Random bytes per script id; hex encoding doubles the length.
    pub id_bytes: usize,
    pub max_id_attempts: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub raw_access: RawAccess,
    /// Directory served for paths no API route claims.
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_content_chars: MAX_CONTENT_CHARS,
            id_bytes: MIN_ID_BYTES,
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            default_page_size: 20,
            max_page_size: 100,
            raw_access: RawAccess::Public,
            static_dir: None,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `SCRIPTBIN_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let config: Config = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Create config from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Loopback config for tests; port 0 picks a free port.
    pub fn test_config_with_port(port: u16) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id_bytes < MIN_ID_BYTES {
            return Err(ConfigError::Validation {
                field: "id_bytes",
                reason: format!("must be at least {}", MIN_ID_BYTES),
            });
        }
        if self.max_id_attempts == 0 {
            return Err(ConfigError::Validation {
                field: "max_id_attempts",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_content_chars == 0 {
            return Err(ConfigError::Validation {
                field: "max_content_chars",
                reason: "must be positive".to_string(),
            });
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(ConfigError::Validation {
                field: "page_size",
                reason: "page sizes must be positive".to_string(),
            });
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Validation {
                field: "default_page_size",
                reason: format!("exceeds max_page_size ({})", self.max_page_size),
            });
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn repository_options(&self) -> RepositoryOptions {
        RepositoryOptions {
            max_content_chars: self.max_content_chars,
            max_id_attempts: self.max_id_attempts,
            raw_access: self.raw_access,
        }
    }
}
