//! Outbound request specification
//!
//! An [`ApiRequest`] is one in-flight call handed to the transport: target
//! URL, method, headers and optional JSON payload. It lives only for the
//! duration of one logical operation, including its single retry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::HttpMethod;

/// `Content-Type` sent with every call.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Caller-facing options for one logical request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestOptions {
    /// HTTP method, `GET` unless set.
    #[serde(default)]
    pub method: HttpMethod,
    /// JSON payload serialized as the request body when present.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

impl RequestOptions {
    /// A bodiless `GET`.
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    /// Options with the given method and no payload.
    #[must_use]
    pub fn method(method: HttpMethod) -> Self {
        Self {
            method,
            payload: None,
        }
    }

    /// A `POST` carrying `payload`.
    #[must_use]
    pub fn post(payload: serde_json::Value) -> Self {
        Self::method(HttpMethod::Post).with_payload(payload)
    }

    /// Sets the JSON payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A fully resolved request ready for the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Correlation id for logs; stable across the retry of the same call.
    pub id: Uuid,
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs in insertion order.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Creates a JSON request with the `Content-Type` header set.
    #[must_use]
    pub fn json(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            method,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: None,
        }
    }

    /// Builds the request for `options` against `url`.
    #[must_use]
    pub fn from_options(url: impl Into<String>, options: &RequestOptions) -> Self {
        let request = Self::json(options.method, url);
        match &options.payload {
            Some(payload) => request.with_body(payload.clone()),
            None => request,
        }
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns a copy carrying `Authorization: Bearer <token>`, replacing
    /// any bearer already attached.
    #[must_use]
    pub fn with_bearer(&self, token: &str) -> Self {
        let mut request = self.clone();
        request
            .headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        request
            .headers
            .push(("Authorization".to_string(), format!("Bearer {token}")));
        request
    }

    /// Looks up a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the bearer token attached to this request, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// Joins an API base URL and an endpoint path.
#[must_use]
pub fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = endpoint.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
