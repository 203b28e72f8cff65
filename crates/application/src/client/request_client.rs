//! Authenticated request client.
//!
//! Wraps the transport with bearer attachment, a pre-flight expiry check,
//! coalesced refresh and a single retry on `401`. Callers see either the
//! backend's 2xx response, untouched, or one [`ClientError`].
//!
//! A logical request is reissued at most once, after its first `401`.
//! Every refresh goes through one async mutex; a task that reaches it after another task has
//! already replaced the stale token reuses the new token instead of
//! refreshing again.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use storefront_domain::{
    ApiRequest, ApiResponse, HttpMethod, RefreshRequest, RequestOptions, TokenResponse,
    token_preview,
};
use tokio::sync::Mutex;
use tracing::{Instrument, debug, debug_span, info, warn};

use crate::auth::TokenStore;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::ports::HttpTransport;

/// Client for the storefront backend that keeps the session's tokens fresh.
pub struct AuthenticatedClient<T> {
    pub(super) config: Arc<ClientConfig>,
    pub(super) transport: Arc<T>,
    pub(super) tokens: TokenStore,
    pub(super) refresh_gate: Arc<Mutex<()>>,
}

impl<T> Clone for AuthenticatedClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            tokens: self.tokens.clone(),
            refresh_gate: Arc::clone(&self.refresh_gate),
        }
    }
}

impl<T> fmt::Debug for AuthenticatedClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("api_base_url", &self.config.api_base_url)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl<T: HttpTransport> AuthenticatedClient<T> {
    /// Creates a client over `transport` using `tokens` for credentials.
    #[must_use]
    pub fn new(config: ClientConfig, transport: Arc<T>, tokens: TokenStore) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            tokens,
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the token store backing this client.
    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Executes one logical call against `endpoint`.
    ///
    /// Refreshes the access token first if it is missing or expired, and
    /// refreshes then retries once if the backend answers `401`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::AuthRequired`] if no access token can be obtained
    ///   or the backend still answers `401` to the retry.
    /// - [`ClientError::InvalidEndpoint`] if `endpoint` is an absolute URL
    ///   on another origin than the API base URL; nothing is sent.
    /// - [`ClientError::Transport`] if the backend cannot be reached.
    /// - [`ClientError::RequestRejected`] for any other non-2xx answer.
    pub async fn request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ClientResult<ApiResponse> {
        let Some(url) = self.config.resolve_endpoint(endpoint) else {
            warn!(endpoint, "refusing to send credentials outside the API base URL");
            return Err(ClientError::InvalidEndpoint(endpoint.to_string()));
        };
        let request = ApiRequest::from_options(url, &options);
        let span = debug_span!(
            "request",
            id = %request.id,
            method = %request.method,
            endpoint = %endpoint,
        );
        self.execute(request).instrument(span).await
    }

    /// Executes a call and decodes the `data` member of its envelope.
    ///
    /// # Errors
    ///
    /// Everything [`Self::request`] returns, plus
    /// [`ClientError::InvalidResponse`] if the body is not an envelope
    /// around a `R`.
    pub async fn request_data<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ClientResult<R> {
        let response = self.request(endpoint, options).await?;
        response
            .data()
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Refreshes the access token now, sharing a refresh already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AuthRequired`] if the refresh fails; stored
    /// credentials are cleared in that case.
    pub async fn refresh(&self) -> ClientResult<String> {
        let current = self.tokens.access_token().await;
        self.refresh_after(current.as_deref()).await
    }

    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let access_token = match self.tokens.access_token().await {
            Some(token)
                if !self.config.proactive_refresh || !self.tokens.is_token_expired(&token) =>
            {
                token
            }
            stale => {
                debug!("access token missing or expired, refreshing before the call");
                self.refresh_after(stale.as_deref()).await?
            }
        };

        let response = self.send(&request.with_bearer(&access_token), 1).await?;
        if !response.is_unauthorized() {
            return Self::finish(response);
        }

        debug!("backend answered 401, refreshing and retrying once");
        let access_token = self.refresh_after(Some(&access_token)).await?;
        let retried = self.send(&request.with_bearer(&access_token), 2).await?;
        if retried.is_unauthorized() {
            return Err(self
                .invalidate("backend rejected the access token after refresh")
                .await);
        }
        Self::finish(retried)
    }

    async fn send(&self, request: &ApiRequest, attempt: u8) -> ClientResult<ApiResponse> {
        debug!(attempt, url = %request.url, "sending request");
        let response = self.transport.send(request).await?;
        debug!(attempt, status = %response.status, "received response");
        Ok(response)
    }

    fn finish(response: ApiResponse) -> ClientResult<ApiResponse> {
        if response.is_success() {
            return Ok(response);
        }
        let body = response.error_body();
        Err(ClientError::RequestRejected {
            status: response.status,
            message: body.message(),
            field_errors: body.field_errors(),
        })
    }

    /// Obtains an access token to replace `stale`.
    ///
    /// Serialized on the refresh gate. If the store already holds a valid
    /// token other than `stale`, a concurrent task refreshed while this one
    /// waited and that token is returned without another refresh call.
    pub(super) async fn refresh_after(&self, stale: Option<&str>) -> ClientResult<String> {
        let _gate = self.refresh_gate.lock().await;

        let held = self.tokens.snapshot().await;
        if let Some(current) = held.access_token.as_deref()
            && Some(current) != stale
            && !self.tokens.is_token_expired(current)
        {
            debug!("reusing access token refreshed by a concurrent request");
            return Ok(current.to_string());
        }

        let Some(refresh_token) = held
            .refresh_token
            .filter(|token| !self.tokens.is_token_expired(token))
        else {
            return Err(self.invalidate("no usable refresh token").await);
        };

        match self.call_refresh_endpoint(&refresh_token).await {
            Ok(response) => {
                let Some(access_token) = response.access_token().map(str::to_string) else {
                    return Err(self
                        .invalidate("refresh response did not include an access token")
                        .await);
                };
                let rotated = response.rotated_refresh_token().map(str::to_string);
                let rotated_refresh = rotated.is_some();
                if let Err(e) = self.tokens.rotate(access_token.clone(), rotated).await {
                    warn!(error = %e, "failed to persist refreshed tokens");
                    return Err(self.invalidate("refreshed tokens could not be stored").await);
                }
                info!(
                    access_token = %token_preview(&access_token),
                    rotated_refresh,
                    "access token refreshed"
                );
                Ok(access_token)
            }
            Err(reason) => Err(self.invalidate(&reason).await),
        }
    }

    async fn call_refresh_endpoint(&self, refresh_token: &str) -> Result<TokenResponse, String> {
        let url = self
            .config
            .resolve_endpoint(&self.config.refresh_endpoint)
            .ok_or_else(|| "refresh endpoint is outside the API base URL".to_string())?;
        let body = serde_json::to_value(RefreshRequest { refresh_token })
            .map_err(|e| format!("failed to encode refresh request: {e}"))?;
        let request = ApiRequest::json(HttpMethod::Post, url).with_body(body);

        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| format!("refresh request failed: {e}"))?;
        if !response.is_success() {
            return Err(format!(
                "refresh endpoint answered {}: {}",
                response.status,
                response.error_body().message()
            ));
        }
        response
            .json::<TokenResponse>()
            .map_err(|e| format!("unreadable refresh response: {e}"))
    }

    /// Clears stored credentials and returns the matching terminal error.
    pub(super) async fn invalidate(&self, reason: &str) -> ClientError {
        warn!(reason, "session invalidated, clearing stored tokens");
        if let Err(e) = self.tokens.clear().await {
            warn!(error = %e, "failed to clear stored tokens");
        }
        ClientError::auth_required(reason)
    }
}
