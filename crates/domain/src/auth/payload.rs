//! Request and response bodies exchanged with the `/auth` endpoints.

use serde::{Deserialize, Serialize};

use super::token::TokenPair;

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl LoginCredentials {
    /// Creates login credentials.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Must match `password`; the backend validates it.
    pub confirm_password: String,
    /// Shipping address.
    pub address: String,
    /// Contact phone number.
    pub phone: String,
}

/// Body of `POST /auth/refresh-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    /// The refresh credential being exchanged.
    pub refresh_token: &'a str,
}

/// Body of `POST /auth/logout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest<'a> {
    /// The refresh credential to revoke.
    pub refresh_token: &'a str,
}

/// Token response returned by login and refresh.
///
/// Login always returns both tokens. Refresh may omit `refreshToken` when
/// the backend does not rotate it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Newly issued access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Rotated refresh token, if the backend issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Returns the complete pair, if both tokens are present and non-empty.
    #[must_use]
    pub fn into_pair(self) -> Option<TokenPair> {
        match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some(TokenPair::new(access, refresh))
            }
            _ => None,
        }
    }

    /// Returns the access token, ignoring an empty string.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns the rotated refresh token, ignoring an empty string.
    #[must_use]
    pub fn rotated_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Profile returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend user id.
    pub id: serde_json::Value,
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Shipping address.
    #[serde(default)]
    pub address: Option<String>,
    /// Contact phone number.
    #[serde(default)]
    pub phone: Option<String>,
}
