//! Credential storage port
//!
//! Defines the persistence medium behind the token store. The pair is
//! always read and written as one record so a reader can never observe
//! a new access token next to an old refresh token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Errors that can occur while reading or writing credentials.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The persisted credential record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Current access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Current refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When this record was written.
    pub saved_at: DateTime<Utc>,
}

impl StoredCredentials {
    /// Returns true if neither token is held.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Port for durable client-side credential storage.
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    /// Loads the stored record. Returns `None` if nothing is stored.
    ///
    /// # Errors
    /// Returns an error if the medium cannot be read or parsed.
    async fn load(&self) -> Result<Option<StoredCredentials>, StorageError>;

    /// Replaces the stored record.
    ///
    /// # Errors
    /// Returns an error if the medium cannot be written.
    async fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError>;

    /// Removes the stored record.
    ///
    /// # Errors
    /// Returns an error if the medium cannot be written.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Revision counter bumped on every write, for media shared between
    /// several client instances. `None` if the medium cannot notify.
    fn watch(&self) -> Option<watch::Receiver<u64>> {
        None
    }
}
