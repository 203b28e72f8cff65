//! Layered application configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `storefront.toml` in the working directory, or an explicit file
//! 3. `STOREFRONT__`-prefixed environment variables, `__` separating
//!    nested keys (`STOREFRONT__CLIENT__API_BASE_URL`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storefront_application::ClientConfig;

use crate::error::InfraError;
use crate::persistence::FileCredentialStorage;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "STOREFRONT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// Multi-line human-readable output.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Everything the binary needs to wire the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Client behaviour.
    pub client: ClientConfig,
    /// Logging.
    pub logging: LoggingConfig,
    /// Credentials file; the user's config directory when unset.
    pub credentials_path: Option<PathBuf>,
}

impl AppConfig {
    /// Loads configuration from defaults, a file and the environment.
    ///
    /// With `path` the file must exist; without it `storefront.toml` is
    /// read if present.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Config`] if a source cannot be read or the
    /// merged values do not fit the schema.
    pub fn load(path: Option<&Path>) -> Result<Self, InfraError> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| InfraError::Config(format!("invalid defaults: {e}")))?;

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("storefront").required(false),
        };

        config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| InfraError::Config(format!("failed to build config: {e}")))?
            .try_deserialize()
            .map_err(|e| InfraError::Config(format!("failed to deserialize config: {e}")))
    }

    /// Checks the client settings.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), InfraError> {
        self.client
            .validate()
            .map_err(|e| InfraError::Config(e.to_string()))
    }

    /// Resolves where credentials are stored.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::Config`] if no path is configured and the
    /// platform has no configuration directory.
    pub fn resolved_credentials_path(&self) -> Result<PathBuf, InfraError> {
        self.credentials_path
            .clone()
            .or_else(FileCredentialStorage::default_path)
            .ok_or_else(|| {
                InfraError::Config(
                    "no configuration directory found, set credentials_path".to_string(),
                )
            })
    }
}
