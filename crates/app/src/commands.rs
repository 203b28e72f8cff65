//! Command execution.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use storefront_application::{
    AuthenticatedClient, ClientError, HttpTransport, StorageError, TokenStore,
};
use storefront_domain::{LoginCredentials, Registration, RequestOptions};
use storefront_infrastructure::{
    AppConfig, FileCredentialStorage, InfraError, ReqwestTransport, SystemClock,
};
use thiserror::Error;
use tracing::debug;

use crate::cli::{Command, LoginArgs, RegisterArgs, RequestArgs};

/// Errors surfaced to the user.
#[derive(Debug, Error)]
pub enum CliError {
    /// The backend call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Adapters could not be set up.
    #[error(transparent)]
    Infra(#[from] InfraError),

    /// Stored credentials could not be read.
    #[error("credential storage error: {0}")]
    Storage(#[from] StorageError),

    /// Bad command line input.
    #[error("{0}")]
    InvalidInput(String),

    /// Writing output failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Client(e) if e.requires_login() => 3,
            Self::Client(ClientError::InvalidEndpoint(_)) | Self::InvalidInput(_) => 2,
            _ => 1,
        }
    }

    /// Returns true if signing in again would resolve the error.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Client(e) if e.requires_login())
    }
}

/// Builds a client over reqwest and the credentials file named by `config`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the credentials file
/// cannot be read.
pub async fn connect(config: &AppConfig) -> Result<AuthenticatedClient<ReqwestTransport>, CliError> {
    config.validate()?;
    let path = config.resolved_credentials_path()?;
    debug!(path = %path.display(), "using credentials file");

    let tokens = TokenStore::open(
        Arc::new(FileCredentialStorage::new(path)),
        Arc::new(SystemClock::new()),
        config.client.token_policy(),
    )
    .await?;
    let transport = ReqwestTransport::new(&config.client)?;
    Ok(AuthenticatedClient::new(
        config.client.clone(),
        Arc::new(transport),
        tokens,
    ))
}

/// Runs one command, writing its result to `out`.
///
/// # Errors
///
/// Returns the first failure; stored tokens have already been cleared if it
/// requires a new login.
pub async fn execute<T, W>(
    client: &AuthenticatedClient<T>,
    command: &Command,
    out: &mut W,
) -> Result<(), CliError>
where
    T: HttpTransport,
    W: Write,
{
    match command {
        Command::Login(args) => login(client, args, out).await,
        Command::Register(args) => register(client, args, out).await,
        Command::Logout => {
            client.logout().await?;
            writeln!(out, "Logged out")?;
            Ok(())
        }
        Command::Me => {
            let user = client.me().await?;
            print_json(out, &user)
        }
        Command::Status => {
            let session = client.tokens().session().await;
            writeln!(out, "{}", session.display_message())?;
            Ok(())
        }
        Command::Refresh => {
            client.refresh().await?;
            let session = client.tokens().session().await;
            writeln!(out, "{}", session.display_message())?;
            Ok(())
        }
        Command::Request(args) => request(client, args, out).await,
    }
}

async fn login<T: HttpTransport, W: Write>(
    client: &AuthenticatedClient<T>,
    args: &LoginArgs,
    out: &mut W,
) -> Result<(), CliError> {
    let credentials = LoginCredentials::new(&args.email, &args.password);
    client.login(&credentials).await?;
    writeln!(out, "Logged in as {}", args.email)?;
    Ok(())
}

async fn register<T: HttpTransport, W: Write>(
    client: &AuthenticatedClient<T>,
    args: &RegisterArgs,
    out: &mut W,
) -> Result<(), CliError> {
    let registration = Registration {
        name: args.name.clone(),
        email: args.email.clone(),
        password: args.password.clone(),
        confirm_password: args
            .confirm_password
            .clone()
            .unwrap_or_else(|| args.password.clone()),
        address: args.address.clone(),
        phone: args.phone.clone(),
    };
    client.register(&registration).await?;
    writeln!(out, "Registered {}, you can now log in", args.email)?;
    Ok(())
}

async fn request<T: HttpTransport, W: Write>(
    client: &AuthenticatedClient<T>,
    args: &RequestArgs,
    out: &mut W,
) -> Result<(), CliError> {
    let mut options = RequestOptions::method(args.method);
    if let Some(data) = &args.data {
        if !args.method.has_body() {
            return Err(CliError::InvalidInput(format!(
                "{} requests cannot carry --data",
                args.method
            )));
        }
        let payload = serde_json::from_str(data)
            .map_err(|e| CliError::InvalidInput(format!("--data is not valid JSON: {e}")))?;
        options = options.with_payload(payload);
    }

    let response = client.request(&args.endpoint, options).await?;
    if response.body.is_empty() {
        writeln!(out, "{}", response.status)?;
        return Ok(());
    }
    match response.json::<serde_json::Value>() {
        Ok(body) if args.raw => print_json(out, &body),
        Ok(mut body) => match body.get_mut("data") {
            Some(data) => print_json(out, &data.take()),
            None => print_json(out, &body),
        },
        Err(_) => {
            writeln!(out, "{}", response.text())?;
            Ok(())
        }
    }
}

fn print_json<W: Write, S: Serialize>(out: &mut W, value: &S) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|e| CliError::Output(std::io::Error::other(e)))?;
    writeln!(out)?;
    Ok(())
}
