//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use storefront_domain::endpoint_url;
use thiserror::Error;

/// Errors found while validating a [`ClientConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No API base URL was configured.
    #[error("api_base_url is required")]
    MissingBaseUrl,

    /// The API base URL is not an absolute http(s) URL.
    #[error("api_base_url is not a valid http(s) URL: {0}")]
    InvalidBaseUrl(String),
}

/// Settings for the authenticated client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every endpoint is joined onto.
    pub api_base_url: String,
    /// Login endpoint.
    pub login_endpoint: String,
    /// Registration endpoint.
    pub register_endpoint: String,
    /// Token refresh endpoint.
    pub refresh_endpoint: String,
    /// Logout endpoint.
    pub logout_endpoint: String,
    /// Current-user endpoint.
    pub me_endpoint: String,
    /// Per-call timeout enforced by the transport.
    pub request_timeout_secs: u64,
    /// Seconds before `exp` at which a token already counts as expired.
    pub expiry_leeway_secs: i64,
    /// Check access-token expiry before each call and refresh first.
    pub proactive_refresh: bool,
    /// Refresh on a fixed timer as well; disabled when unset.
    pub background_refresh_secs: Option<u64>,
    /// Stored credentials older than this are discarded on load.
    pub max_credential_age_secs: i64,
    /// `User-Agent` sent by the transport.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            login_endpoint: "/auth/login".to_string(),
            register_endpoint: "/auth/register".to_string(),
            refresh_endpoint: "/auth/refresh-token".to_string(),
            logout_endpoint: "/auth/logout".to_string(),
            me_endpoint: "/auth/me".to_string(),
            request_timeout_secs: 30,
            expiry_leeway_secs: 10,
            proactive_refresh: true,
            background_refresh_secs: None,
            max_credential_age_secs: 7 * 24 * 60 * 60,
            user_agent: concat!("storefront/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the base URL.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the base URL is missing or not http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        let parsed =
            url::Url::parse(base).map_err(|e| ConfigError::InvalidBaseUrl(format!("{base}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl(base.to_string()));
        }
        Ok(())
    }

    /// Resolves `endpoint` against the base URL.
    ///
    /// Paths are joined onto the base URL. An absolute URL is accepted only
    /// when it has the same origin as the base URL; any other host gets
    /// `None` so session credentials never leave the backend.
    #[must_use]
    pub fn resolve_endpoint(&self, endpoint: &str) -> Option<String> {
        match url::Url::parse(endpoint) {
            Ok(absolute) => {
                let base = url::Url::parse(self.api_base_url.trim()).ok()?;
                (absolute.origin() == base.origin()).then(|| absolute.into())
            }
            Err(_) => Some(endpoint_url(&self.api_base_url, endpoint)),
        }
    }

    /// Per-call timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Background refresh period, if enabled.
    #[must_use]
    pub fn background_refresh_interval(&self) -> Option<Duration> {
        self.background_refresh_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Token expiry and retention policy derived from this configuration.
    #[must_use]
    pub fn token_policy(&self) -> crate::auth::TokenPolicy {
        crate::auth::TokenPolicy {
            leeway_seconds: self.expiry_leeway_secs,
            max_credential_age: chrono::Duration::try_seconds(self.max_credential_age_secs)
                .unwrap_or(chrono::Duration::MAX),
        }
    }
}
