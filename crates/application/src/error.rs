//! Client error types

use std::collections::BTreeMap;

use storefront_domain::StatusCode;
use thiserror::Error;

use crate::ports::{StorageError, TransportError};

/// Which kind of follow-up a failure calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The session is gone; send the user to login.
    Auth,
    /// The request failed; show the message.
    Request,
}

/// Terminal outcome of one logical request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No valid access token and no way to obtain one. Stored credentials
    /// have been cleared.
    #[error("authentication required: {reason}")]
    AuthRequired {
        /// Why the session could not be recovered.
        reason: String,
    },

    /// The backend could not be reached.
    #[error("network error: {0}")]
    Transport(#[from] TransportError),

    /// The backend answered with a non-2xx status unrelated to
    /// authorization.
    #[error("{message}")]
    RequestRejected {
        /// Status returned by the backend.
        status: StatusCode,
        /// Server-provided message.
        message: String,
        /// Per-field validation messages, keyed by field name.
        field_errors: BTreeMap<String, String>,
    },

    /// The endpoint names a host other than the configured backend. No
    /// call was made.
    #[error("endpoint {0} is outside the configured API base URL")]
    InvalidEndpoint(String),

    /// A 2xx response whose body did not have the expected shape.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// The credential medium could not be written.
    #[error("credential storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Creates an [`ClientError::AuthRequired`].
    #[must_use]
    pub fn auth_required(reason: impl Into<String>) -> Self {
        Self::AuthRequired {
            reason: reason.into(),
        }
    }

    /// Returns the follow-up this error calls for.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthRequired { .. } => ErrorCategory::Auth,
            _ => ErrorCategory::Request,
        }
    }

    /// Returns true if the caller should redirect to login.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self.category(), ErrorCategory::Auth)
    }

    /// Returns the HTTP status for rejected requests.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RequestRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
