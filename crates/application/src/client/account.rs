//! Account operations: login, registration, logout and profile.

use storefront_domain::{
    ApiRequest, ApiResponse, HttpMethod, LoginCredentials, LogoutRequest, Registration,
    RequestOptions, TokenResponse, User,
};
use tracing::{info, warn};

use super::AuthenticatedClient;
use crate::error::{ClientError, ClientResult};
use crate::ports::HttpTransport;

impl<T: HttpTransport> AuthenticatedClient<T> {
    /// Exchanges credentials for a token pair and stores it.
    ///
    /// # Errors
    ///
    /// - [`ClientError::RequestRejected`] with per-field messages if the
    ///   backend refuses the credentials.
    /// - [`ClientError::InvalidResponse`] if the answer carries no pair.
    /// - [`ClientError::Transport`] / [`ClientError::Storage`] otherwise.
    pub async fn login(&self, credentials: &LoginCredentials) -> ClientResult<()> {
        let response = self
            .post_anonymous(&self.config.login_endpoint, serde_json::to_value(credentials))
            .await?;

        let pair = response
            .json::<TokenResponse>()
            .ok()
            .and_then(TokenResponse::into_pair)
            .ok_or_else(|| {
                ClientError::InvalidResponse("login response did not include a token pair".into())
            })?;

        let _gate = self.refresh_gate.lock().await;
        self.tokens.replace_pair(pair).await?;
        info!(email = %credentials.email, "logged in");
        Ok(())
    }

    /// Creates an account. Does not log in.
    ///
    /// # Errors
    ///
    /// [`ClientError::RequestRejected`] with per-field messages if the
    /// backend refuses the registration, [`ClientError::Transport`] if it
    /// cannot be reached.
    pub async fn register(&self, registration: &Registration) -> ClientResult<()> {
        self.post_anonymous(
            &self.config.register_endpoint,
            serde_json::to_value(registration),
        )
        .await?;
        info!(email = %registration.email, "registered account");
        Ok(())
    }

    /// Ends the session.
    ///
    /// Local tokens are always cleared. The backend is told to revoke the
    /// refresh token on a best-effort basis; its answer is only logged.
    ///
    /// # Errors
    ///
    /// [`ClientError::Storage`] if the credential medium cannot be cleared.
    pub async fn logout(&self) -> ClientResult<()> {
        let held = {
            let _gate = self.refresh_gate.lock().await;
            let held = self.tokens.snapshot().await;
            self.tokens.clear().await?;
            held
        };
        info!("logged out");

        let Some(refresh_token) = held.refresh_token.as_deref() else {
            return Ok(());
        };
        let body = match serde_json::to_value(LogoutRequest { refresh_token }) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to encode logout request");
                return Ok(());
            }
        };
        let Some(url) = self.config.resolve_endpoint(&self.config.logout_endpoint) else {
            warn!("logout endpoint is outside the API base URL, skipping revocation");
            return Ok(());
        };
        let mut request = ApiRequest::json(HttpMethod::Post, url).with_body(body);
        if let Some(access_token) = held.access_token.as_deref() {
            request = request.with_bearer(access_token);
        }

        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => {
                warn!(status = %response.status, "backend did not acknowledge logout");
            }
            Err(e) => warn!(error = %e, "logout request failed"),
        }
        Ok(())
    }

    /// Fetches the logged-in user's profile.
    ///
    /// # Errors
    ///
    /// Everything [`Self::request_data`] returns.
    pub async fn me(&self) -> ClientResult<User> {
        self.request_data(&self.config.me_endpoint, RequestOptions::get())
            .await
    }

    async fn post_anonymous(
        &self,
        endpoint: &str,
        body: Result<serde_json::Value, serde_json::Error>,
    ) -> ClientResult<ApiResponse> {
        let body = body.map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        let url = self
            .config
            .resolve_endpoint(endpoint)
            .ok_or_else(|| ClientError::InvalidEndpoint(endpoint.to_string()))?;
        let request = ApiRequest::json(HttpMethod::Post, url).with_body(body);
        let response = self.transport.send(&request).await?;
        if response.is_success() {
            return Ok(response);
        }
        let error = response.error_body();
        Err(ClientError::RequestRejected {
            status: response.status,
            message: error.message(),
            field_errors: error.field_errors(),
        })
    }
}
