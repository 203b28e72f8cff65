//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::InfraError;

/// Installs the global subscriber. Events go to stderr so command output on
/// stdout stays machine-readable.
///
/// `RUST_LOG` wins over the configured level when set.
///
/// # Errors
///
/// Returns [`InfraError::Logging`] if the level is not a valid filter or a
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), InfraError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| InfraError::Logging(format!("invalid level {:?}: {e}", config.level)))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| InfraError::Logging(e.to_string()))
}
