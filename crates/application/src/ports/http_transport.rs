//! HTTP transport port

use std::future::Future;

use storefront_domain::{ApiRequest, ApiResponse};
use thiserror::Error;

/// Errors raised when a call could not reach the backend or its response
/// could not be read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The call did not complete within the configured timeout.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The backend host could not be resolved.
    #[error("could not resolve host {host}: {message}")]
    DnsError {
        /// Host that failed to resolve.
        host: String,
        /// Resolver message.
        message: String,
    },

    /// The backend refused the connection.
    #[error("connection refused by {host}:{port}")]
    ConnectionRefused {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// Any other connection-level failure.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Unclassified transport failure.
    #[error("{0}")]
    Other(String),
}

/// Port for sending one request to the backend.
///
/// Implementations perform exactly one network exchange per call: no
/// retries, no redirects into auth flows, no token handling. Those belong
/// to the client layered on top.
pub trait HttpTransport: Send + Sync {
    /// Sends the request and returns whatever the backend answered,
    /// including non-2xx responses.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] only when no response was obtained.
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}
