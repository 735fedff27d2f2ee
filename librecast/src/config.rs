//! Configuration management for Recast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, Result};

/// Deployment environment a run operates against.
///
/// Selects which database section of the config file applies and which
/// credential environment variables are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Prod,
    Dev,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "prod" => Ok(Environment::Prod),
            "dev" => Ok(Environment::Dev),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Prod => write!(f, "prod"),
            Environment::Dev => write!(f, "dev"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

/// Per-environment database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub prod: DatabaseEnvConfig,
    pub dev: DatabaseEnvConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseEnvConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Scratch directory for donor media downloads; purged before each
    /// publish attempt.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
        }
    }
}

fn default_scratch_dir() -> String {
    "~/.cache/recast/media".to_string()
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                prod: DatabaseEnvConfig {
                    path: "~/.local/share/recast/recast.db".to_string(),
                },
                dev: DatabaseEnvConfig {
                    path: "~/.local/share/recast/recast-dev.db".to_string(),
                },
            },
            media: MediaConfig::default(),
        }
    }

    /// Database settings for the given environment
    pub fn database_for(&self, env: Environment) -> &DatabaseEnvConfig {
        match env {
            Environment::Prod => &self.database.prod,
            Environment::Dev => &self.database.dev,
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("RECAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("recast").join("config.toml"))
}

/// API credential material, loaded from the environment once at startup and
/// passed explicitly to the client at construction time.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub bearer_token: String,
}

impl ApiCredentials {
    /// Read credentials for `env` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when the variable is unset or
    /// blank.
    pub fn from_env(env: Environment) -> Result<Self> {
        let var = match env {
            Environment::Prod => "TWITTER_BEARER_TOKEN",
            Environment::Dev => "TWITTER_BEARER_TOKEN_DEV",
        };

        let bearer_token = std::env::var(var)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))?;

        Ok(Self { bearer_token })
    }
}
