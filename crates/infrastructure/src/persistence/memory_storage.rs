//! In-process credential storage.

use async_trait::async_trait;
use storefront_application::ports::{CredentialStorage, StorageError, StoredCredentials};
use tokio::sync::{RwLock, watch};

/// Credential storage held in memory.
///
/// Several token stores may share one instance; each write bumps a revision
/// counter so their storage listeners reload.
#[derive(Debug)]
pub struct InMemoryCredentialStorage {
    record: RwLock<Option<StoredCredentials>>,
    revision: watch::Sender<u64>,
}

impl Default for InMemoryCredentialStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCredentialStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            record: RwLock::new(None),
            revision,
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }
}

#[async_trait]
impl CredentialStorage for InMemoryCredentialStorage {
    async fn load(&self) -> Result<Option<StoredCredentials>, StorageError> {
        Ok(self.record.read().await.clone())
    }

    async fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError> {
        *self.record.write().await = Some(credentials.clone());
        self.bump();
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.record.write().await = None;
        self.bump();
        Ok(())
    }

    fn watch(&self) -> Option<watch::Receiver<u64>> {
        Some(self.revision.subscribe())
    }
}
