//! Infrastructure error types

use thiserror::Error;

/// Errors raised while wiring adapters together.
#[derive(Debug, Error)]
pub enum InfraError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP client could not be built.
    #[error("transport setup failed: {0}")]
    Transport(String),

    /// The log subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}
