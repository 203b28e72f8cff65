//! Token store with expiry evaluation.
//!
//! This module provides a shared store for the access/refresh token pair.
//! Every mutation writes the whole pair to the [`CredentialStorage`] medium
//! under one write lock, so a reader preparing the next request never sees
//! a half-replaced pair. Session state is derived from the pair on each
//! change and published through a `watch` channel.

use std::fmt;
use std::sync::Arc;

use storefront_domain::{TokenPair, decode_claims, is_expired_at};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::session::SessionState;
use crate::ports::{Clock, CredentialStorage, StorageError, StoredCredentials};

/// Expiry and retention rules applied by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Seconds before `exp` at which a token already counts as expired.
    pub leeway_seconds: i64,
    /// Stored records older than this are discarded on load.
    pub max_credential_age: chrono::Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            leeway_seconds: 10,
            max_credential_age: chrono::Duration::days(7),
        }
    }
}

/// A consistent snapshot of the held tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Current access token.
    pub access_token: Option<String>,
    /// Current refresh token.
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Returns true if neither token is held.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl From<StoredCredentials> for Credentials {
    fn from(record: StoredCredentials) -> Self {
        Self {
            access_token: record.access_token,
            refresh_token: record.refresh_token,
        }
    }
}

impl From<TokenPair> for Credentials {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: Some(pair.access_token),
            refresh_token: Some(pair.refresh_token),
        }
    }
}

struct Inner {
    storage: Arc<dyn CredentialStorage>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
    credentials: RwLock<Credentials>,
    session: watch::Sender<SessionState>,
}

/// Shared store for the session's token pair.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("policy", &self.inner.policy)
            .field("session", &*self.inner.session.borrow())
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Creates an empty store over `storage`. Call [`Self::reload`] to pick
    /// up credentials already persisted, or use [`Self::open`].
    #[must_use]
    pub fn new(
        storage: Arc<dyn CredentialStorage>,
        clock: Arc<dyn Clock>,
        policy: TokenPolicy,
    ) -> Self {
        let (session, _) = watch::channel(SessionState::LoggedOut);
        Self {
            inner: Arc::new(Inner {
                storage,
                clock,
                policy,
                credentials: RwLock::new(Credentials::default()),
                session,
            }),
        }
    }

    /// Creates a store and loads whatever `storage` holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    pub async fn open(
        storage: Arc<dyn CredentialStorage>,
        clock: Arc<dyn Clock>,
        policy: TokenPolicy,
    ) -> Result<Self, StorageError> {
        let store = Self::new(storage, clock, policy);
        store.reload().await?;
        Ok(store)
    }

    /// Re-reads the medium, discarding a record that is too old or holds
    /// no usable token, and republishes the session state.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read or cleared.
    pub async fn reload(&self) -> Result<SessionState, StorageError> {
        let mut guard = self.inner.credentials.write().await;
        let loaded = match self.inner.storage.load().await? {
            Some(record) if self.is_retainable(&record) => Credentials::from(record),
            Some(_) => {
                debug!("discarding stale stored credentials");
                self.inner.storage.clear().await?;
                Credentials::default()
            }
            None => Credentials::default(),
        };
        *guard = loaded;
        Ok(self.publish(&guard))
    }

    /// Returns the current access token.
    pub async fn access_token(&self) -> Option<String> {
        self.inner.credentials.read().await.access_token.clone()
    }

    /// Returns the current refresh token.
    pub async fn refresh_token(&self) -> Option<String> {
        self.inner.credentials.read().await.refresh_token.clone()
    }

    /// Returns both tokens as read under one lock.
    pub async fn snapshot(&self) -> Credentials {
        self.inner.credentials.read().await.clone()
    }

    /// Stores a new access token, keeping the refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written; the held pair is
    /// then unchanged.
    pub async fn set_access_token(&self, token: impl Into<String>) -> Result<(), StorageError> {
        let token = token.into();
        self.update(|c| c.access_token = Some(token)).await
    }

    /// Removes the access token, keeping the refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    pub async fn remove_access_token(&self) -> Result<(), StorageError> {
        self.update(|c| c.access_token = None).await
    }

    /// Stores a new refresh token, keeping the access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    pub async fn set_refresh_token(&self, token: impl Into<String>) -> Result<(), StorageError> {
        let token = token.into();
        self.update(|c| c.refresh_token = Some(token)).await
    }

    /// Removes the refresh token, keeping the access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    pub async fn remove_refresh_token(&self) -> Result<(), StorageError> {
        self.update(|c| c.refresh_token = None).await
    }

    /// Replaces both tokens in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    pub async fn replace_pair(&self, pair: TokenPair) -> Result<(), StorageError> {
        self.update(|c| *c = Credentials::from(pair)).await
    }

    /// Installs a refreshed access token and, when the backend rotated it,
    /// the new refresh token, in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    pub async fn rotate(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Result<(), StorageError> {
        let access_token = access_token.into();
        self.update(|c| {
            c.access_token = Some(access_token);
            if let Some(refresh_token) = refresh_token {
                c.refresh_token = Some(refresh_token);
            }
        })
        .await
    }

    /// Drops both tokens.
    ///
    /// The held pair is dropped even if the medium cannot be cleared, so
    /// the session always reads as logged out afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be cleared.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self.inner.credentials.write().await;
        *guard = Credentials::default();
        self.publish(&guard);
        self.inner.storage.clear().await
    }

    /// Returns true if `token` is expired, expires within the leeway, or
    /// carries no readable expiry claim.
    #[must_use]
    pub fn is_token_expired(&self, token: &str) -> bool {
        is_expired_at(
            token,
            self.inner.clock.now(),
            self.inner.policy.leeway_seconds,
        )
    }

    /// Returns true if `token` will count as expired `within` from now.
    #[must_use]
    pub fn expires_within(&self, token: &str, within: chrono::Duration) -> bool {
        let at = self
            .inner
            .clock
            .now()
            .checked_add_signed(within)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
        is_expired_at(token, at, self.inner.policy.leeway_seconds)
    }

    /// Returns the session state computed from the pair held right now.
    pub async fn session(&self) -> SessionState {
        let guard = self.inner.credentials.read().await;
        self.derive_session(&guard)
    }

    /// Returns true while requests can be authorized without a new login.
    pub async fn is_logged_in(&self) -> bool {
        self.session().await.is_logged_in()
    }

    /// Subscribes to session state changes caused by writes or reloads.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.session.subscribe()
    }

    /// Reloads whenever another client instance writes the shared medium.
    ///
    /// Returns `None` if the medium cannot notify. Abort the handle to stop
    /// listening.
    #[must_use]
    pub fn spawn_storage_listener(&self) -> Option<JoinHandle<()>> {
        let mut revisions = self.inner.storage.watch()?;
        let store = self.clone();
        Some(tokio::spawn(async move {
            while revisions.changed().await.is_ok() {
                if let Err(e) = store.reload().await {
                    warn!(error = %e, "failed to reload credentials after external change");
                }
            }
        }))
    }

    async fn update<F>(&self, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Credentials) + Send,
    {
        let mut guard = self.inner.credentials.write().await;
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next).await?;
        *guard = next;
        self.publish(&guard);
        Ok(())
    }

    async fn persist(&self, credentials: &Credentials) -> Result<(), StorageError> {
        if credentials.is_empty() {
            return self.inner.storage.clear().await;
        }
        let record = StoredCredentials {
            access_token: credentials.access_token.clone(),
            refresh_token: credentials.refresh_token.clone(),
            saved_at: self.inner.clock.now(),
        };
        self.inner.storage.save(&record).await
    }

    fn is_retainable(&self, record: &StoredCredentials) -> bool {
        let age = self.inner.clock.now().signed_duration_since(record.saved_at);
        if age >= self.inner.policy.max_credential_age {
            return false;
        }
        self.derive_session(&Credentials::from(record.clone()))
            .is_logged_in()
    }

    fn derive_session(&self, credentials: &Credentials) -> SessionState {
        let now = self.inner.clock.now();
        if let Some(access) = credentials.access_token.as_deref()
            && !self.is_token_expired(access)
        {
            let expires_in_secs = decode_claims(access)
                .ok()
                .and_then(|claims| claims.exp)
                .map_or(0, |exp| exp - now.timestamp());
            return SessionState::Active { expires_in_secs };
        }
        if credentials
            .refresh_token
            .as_deref()
            .is_some_and(|refresh| !self.is_token_expired(refresh))
        {
            SessionState::NeedsRefresh
        } else {
            SessionState::LoggedOut
        }
    }

    fn publish(&self, credentials: &Credentials) -> SessionState {
        let state = self.derive_session(credentials);
        self.inner.session.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        state
    }
}
