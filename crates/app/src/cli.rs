//! Command line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use storefront_domain::HttpMethod;
use storefront_infrastructure::{AppConfig, InfraError};

/// Storefront API client
#[derive(Debug, Parser)]
#[command(name = "storefront", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file (default: ./storefront.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, overriding the configuration
    #[arg(long, global = true, env = "STOREFRONT_API_BASE_URL")]
    pub base_url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sign in and store the session tokens
    Login(LoginArgs),
    /// Create an account
    Register(RegisterArgs),
    /// Revoke the session and forget the stored tokens
    Logout,
    /// Show the signed-in user's profile
    Me,
    /// Show the local session state without contacting the backend
    Status,
    /// Exchange the refresh token for a new access token now
    Refresh,
    /// Call any endpoint with the session's credentials
    Request(RequestArgs),
}

/// Arguments for `login`
#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Arguments for `register`
#[derive(Debug, Clone, Args)]
pub struct RegisterArgs {
    /// Display name
    #[arg(long)]
    pub name: String,

    /// Account email
    #[arg(long)]
    pub email: String,

    /// Chosen password
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Password confirmation (defaults to the password)
    #[arg(long)]
    pub confirm_password: Option<String>,

    /// Shipping address
    #[arg(long, default_value = "")]
    pub address: String,

    /// Contact phone number
    #[arg(long, default_value = "")]
    pub phone: String,
}

/// Arguments for `request`
#[derive(Debug, Clone, Args)]
pub struct RequestArgs {
    /// Endpoint path relative to the base URL, e.g. `/products`
    pub endpoint: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: HttpMethod,

    /// JSON payload
    #[arg(short, long)]
    pub data: Option<String>,

    /// Print the whole body instead of its `data` member
    #[arg(long)]
    pub raw: bool,
}

impl Cli {
    /// Loads configuration and applies command line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub fn load_config(&self) -> Result<AppConfig, InfraError> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(base_url) = &self.base_url {
            config.client.api_base_url.clone_from(base_url);
        }
        Ok(config)
    }
}
