//! Configuration management for Likesweep
//!
//! Secrets and the target account come from the environment (optionally
//! seeded from a `.env` file). Non-secret tuning comes from an optional TOML
//! file. Both are read once at startup into a [`Config`].

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

pub const ENV_CONSUMER_KEY: &str = "CONSUMER_KEY";
pub const ENV_CONSUMER_SECRET: &str = "CONSUMER_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const ENV_ACCESS_SECRET: &str = "ACCESS_SECRET";
pub const ENV_ACCOUNT_ID: &str = "TWITTER_ID";

pub const DEFAULT_BASE_URL: &str = "https://api.x.com/2";
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

/// OAuth1 user-context credentials
#[derive(Debug)]
pub struct Credentials {
    pub consumer_key: SecretString,
    pub consumer_secret: SecretString,
    pub access_token: SecretString,
    pub access_secret: SecretString,
}

impl Credentials {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: SecretString::from(consumer_key.into()),
            consumer_secret: SecretString::from(consumer_secret.into()),
            access_token: SecretString::from(access_token.into()),
            access_secret: SecretString::from(access_secret.into()),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub credentials: Credentials,
    pub account_id: String,
    pub api: ApiConfig,
    pub sweep: SweepConfig,
}

/// The TOML file layout. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Page size forwarded as `max_results`; the API default applies when unset
    pub max_results: Option<u32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: format!("likesweep/{}", env!("CARGO_PKG_VERSION")),
            max_results: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub default_rate_limit_wait_secs: u64,
    pub max_pages: Option<u32>,
    pub dry_run: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            default_rate_limit_wait_secs: DEFAULT_RATE_LIMIT_WAIT_SECS,
            max_pages: None,
            dry_run: false,
        }
    }
}

/// Where to look for the env file and the TOML file
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub env_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        Self::load_with(&LoadOptions::default())
    }

    /// Seed the environment from the env file, then build the configuration
    /// from the process environment and the TOML file.
    pub fn load_with(options: &LoadOptions) -> Result<Self> {
        load_env_file(options.env_file.as_deref())?;

        let file = match &options.config_file {
            Some(path) => FileConfig::load_from_path(path)?,
            None => FileConfig::load_default()?,
        };

        Self::from_lookup(|key| std::env::var(key).ok(), file)
    }

    /// Build a configuration from a variable lookup and a parsed file
    pub fn from_lookup<F>(lookup: F, file: FileConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| -> std::result::Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingField(key.to_string()))
        };

        let credentials = Credentials::new(
            require(ENV_CONSUMER_KEY)?,
            require(ENV_CONSUMER_SECRET)?,
            require(ENV_ACCESS_TOKEN)?,
            require(ENV_ACCESS_SECRET)?,
        );
        let account_id = require(ENV_ACCOUNT_ID)?;

        let config = Self {
            credentials,
            account_id,
            api: file.api,
            sweep: file.sweep,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.account_id.contains('/') {
            return Err(invalid(ENV_ACCOUNT_ID, "must not contain '/'"));
        }

        url::Url::parse(&self.api.base_url)
            .map_err(|e| invalid("api.base_url", &e.to_string()))?;

        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be greater than zero"));
        }

        if let Some(n) = self.api.max_results {
            if !(1..=100).contains(&n) {
                return Err(invalid("api.max_results", "must be between 1 and 100"));
            }
        }

        if self.sweep.max_pages == Some(0) {
            return Err(invalid("sweep.max_pages", "must be greater than zero"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> crate::error::LikesweepError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

impl FileConfig {
    /// Load from the resolved default path; a missing file yields defaults
    pub fn load_default() -> Result<Self> {
        let path = resolve_config_path()?;
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: FileConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }
}

/// Load variables from an env file without overriding ones already set.
///
/// An explicit path (argument or `LIKESWEEP_ENV_FILE`) must exist. The
/// implicit lookup reads `.env` in the working directory only and is
/// allowed to find nothing.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("LIKESWEEP_ENV_FILE").ok().map(expand_path));

    match explicit {
        Some(path) => {
            dotenvy::from_path(&path)
                .map_err(|e| ConfigError::EnvFile(format!("{}: {}", path.display(), e)))?;
            tracing::debug!("Loaded environment from {}", path.display());
        }
        // ./.env only, never one found in a parent directory
        None => match dotenvy::from_path(DEFAULT_ENV_FILE) {
            Ok(()) => tracing::debug!("Loaded environment from {}", DEFAULT_ENV_FILE),
            Err(e) if e.not_found() => {
                tracing::debug!("No {} in the working directory", DEFAULT_ENV_FILE)
            }
            Err(e) => {
                return Err(ConfigError::EnvFile(format!("{}: {}", DEFAULT_ENV_FILE, e)).into())
            }
        },
    }

    Ok(())
}

/// Resolve the configuration file path under the XDG config directory
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("LIKESWEEP_CONFIG") {
        return Ok(expand_path(path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("likesweep").join("config.toml"))
}

fn expand_path(path: String) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path).to_string())
}
