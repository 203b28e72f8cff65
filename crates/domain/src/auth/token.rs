//! Bearer token pair and embedded-expiry decoding.
//!
//! Access and refresh tokens are opaque to the client except for the
//! expiry claim carried in their JWT payload segment. Nothing here verifies
//! signatures; the backend remains the authority on validity.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The access/refresh credential pair held for one client session.
///
/// Both fields are always replaced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived bearer credential.
    pub access_token: String,
    /// Longer-lived credential used only to mint a new access token.
    pub refresh_token: String,
}

impl TokenPair {
    /// Creates a new token pair.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// Claims read from a token's payload segment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiry as seconds since the Unix epoch.
    pub exp: Option<i64>,
    /// Issued-at as seconds since the Unix epoch.
    #[serde(default)]
    pub iat: Option<i64>,
    /// Subject (usually the user id).
    #[serde(default, deserialize_with = "subject_as_string")]
    pub sub: Option<String>,
}

impl TokenClaims {
    /// Returns the expiry instant, if the claim is present and representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

/// Backends disagree on whether `sub` is a number or a string.
fn subject_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Reasons a token's claims could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenDecodeError {
    /// The token does not have the `header.payload.signature` shape.
    #[error("token is not a three-part JWT")]
    Malformed,

    /// The payload segment is not valid base64url.
    #[error("token payload is not valid base64url: {0}")]
    Base64(String),

    /// The payload segment is not a JSON claims object.
    #[error("token payload is not valid JSON: {0}")]
    Json(String),

    /// The claims object carries no usable `exp`.
    #[error("token has no expiry claim")]
    MissingExpiry,
}

/// Decodes the claims embedded in a JWT-shaped token.
///
/// # Errors
///
/// Returns a [`TokenDecodeError`] if the token is not three dot-separated
/// segments or the payload segment is not base64url-encoded JSON.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenDecodeError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenDecodeError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenDecodeError::Base64(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenDecodeError::Json(e.to_string()))
}

/// Returns the expiry instant embedded in `token`.
fn expiry_of(token: &str) -> Result<DateTime<Utc>, TokenDecodeError> {
    decode_claims(token)?
        .expires_at()
        .ok_or(TokenDecodeError::MissingExpiry)
}

/// Returns true if `token` should be treated as expired at `now`.
///
/// A token that cannot be decoded, or has no expiry claim, is expired.
/// `leeway_seconds` pulls the deadline earlier so a token about to lapse
/// in flight is refreshed first.
#[must_use]
pub fn is_expired_at(token: &str, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
    let deadline = Duration::try_seconds(leeway_seconds).and_then(|l| now.checked_add_signed(l));
    expiry_of(token)
        .ok()
        .is_none_or(|expires_at| deadline.is_none_or(|deadline| deadline >= expires_at))
}

/// Returns a log-safe preview of a token (first 8 chars + ...).
#[must_use]
pub fn token_preview(token: &str) -> String {
    match token.char_indices().nth(8) {
        Some((idx, _)) if token.len() > 12 => format!("{}...", &token[..idx]),
        _ => "***".to_string(),
    }
}
