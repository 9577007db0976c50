//! Configuration loading and resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! remaining tiers apply. A config file that exists but cannot be parsed is
//! reported as [`Error::Config`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name under the platform config directory
pub const APP_DIR_NAME: &str = "churn-client";

/// Environment variable names
pub const ENV_ML_API_URL: &str = "CHURN_ML_API_URL";
pub const ENV_BACKEND_URL: &str = "CHURN_BACKEND_URL";
pub const ENV_USER_ID: &str = "CHURN_USER_ID";
pub const ENV_TOKEN: &str = "CHURN_TOKEN";
pub const ENV_EMAIL: &str = "CHURN_EMAIL";
pub const ENV_PASSWORD: &str = "CHURN_PASSWORD";
pub const ENV_LOG_LEVEL: &str = "CHURN_LOG_LEVEL";

/// Compiled-in defaults, used when no other tier supplies a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub ml_api_url: String,
    pub backend_url: String,
    pub log_level: String,
    pub download_dir: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            ml_api_url: "http://127.0.0.1:8000".to_string(),
            backend_url: "http://127.0.0.1:4000".to_string(),
            log_level: "info".to_string(),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// On-disk TOML configuration
///
/// All fields are optional; unknown keys are ignored so older files keep
/// loading.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    pub ml_api_url: Option<String>,
    pub backend_url: Option<String>,
    /// Opaque user/session identity sent with every request
    pub identity: Option<String>,
    pub bearer_token: Option<String>,
    pub email: Option<String>,
    pub log_level: Option<String>,
    pub download_dir: Option<PathBuf>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub ml_api_url: Option<String>,
    pub backend_url: Option<String>,
    pub identity: Option<String>,
    pub bearer_token: Option<String>,
    pub log_level: Option<String>,
    pub download_dir: Option<PathBuf>,
}

/// Fully resolved client configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the prediction service, no trailing slash
    pub ml_api_url: String,
    /// Base URL of the account backend, no trailing slash
    pub backend_url: String,
    pub identity: Option<String>,
    pub bearer_token: Option<String>,
    pub email: Option<String>,
    /// Only ever read from the environment
    pub password: Option<String>,
    pub log_level: String,
    pub download_dir: PathBuf,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("ml_api_url", &self.ml_api_url)
            .field("backend_url", &self.backend_url)
            .field("identity", &self.identity)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("log_level", &self.log_level)
            .field("download_dir", &self.download_dir)
            .finish()
    }
}

/// Resolves [`ClientConfig`] from the four tiers
pub struct ConfigResolver {
    config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver reading the platform default config file
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Resolver reading an explicit config file instead of the default
    pub fn with_config_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Resolve the configuration, applying overrides on top
    pub fn resolve(&self, overrides: &ConfigOverrides) -> Result<ClientConfig> {
        let file = self.load_file()?;
        let defaults = CompiledDefaults::for_current_platform();

        let ml_api_url = first_set([
            overrides.ml_api_url.clone(),
            env_value(ENV_ML_API_URL),
            file.ml_api_url.clone(),
        ])
        .unwrap_or(defaults.ml_api_url);

        let backend_url = first_set([
            overrides.backend_url.clone(),
            env_value(ENV_BACKEND_URL),
            file.backend_url.clone(),
        ])
        .unwrap_or(defaults.backend_url);

        let log_level = first_set([
            overrides.log_level.clone(),
            env_value(ENV_LOG_LEVEL),
            file.log_level.clone(),
        ])
        .unwrap_or(defaults.log_level);

        let download_dir = overrides
            .download_dir
            .clone()
            .or(file.download_dir.clone())
            .unwrap_or(defaults.download_dir);

        let config = ClientConfig {
            ml_api_url: normalize_base_url(&ml_api_url)?,
            backend_url: normalize_base_url(&backend_url)?,
            identity: first_set([
                overrides.identity.clone(),
                env_value(ENV_USER_ID),
                file.identity.clone(),
            ]),
            bearer_token: first_set([
                overrides.bearer_token.clone(),
                env_value(ENV_TOKEN),
                file.bearer_token.clone(),
            ]),
            email: first_set([env_value(ENV_EMAIL), file.email.clone()]),
            password: env_value(ENV_PASSWORD),
            log_level,
            download_dir,
        };

        debug!(?config, "Resolved client configuration");
        Ok(config)
    }

    fn load_file(&self) -> Result<TomlConfig> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => match default_config_path() {
                Some(path) => path,
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(TomlConfig::default());
                }
            },
        };

        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(TomlConfig::default());
        }

        load_toml_config(&path)
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Default config file location: `<config_dir>/churn-client/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

/// Validate a base URL and strip trailing slashes
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::InvalidInput(format!(
            "Base URL must start with http:// or https://: {:?}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

/// Treat empty strings and a literal `""` as unset
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() || trimmed == "\"\"" {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_value(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

fn first_set<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates.into_iter().find_map(non_empty)
}
