#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use serde_json::json;
use storefront_domain::{LoginCredentials, Registration, RequestOptions, TokenPair};

use super::AuthenticatedClient;
use crate::auth::{SessionState, TokenStore};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::ports::Clock;
use crate::test_support::{
    BASE_URL, EMAIL, FakeBackend, ManualClock, MemoryStorage, PASSWORD, jwt_expiring_at,
};

const REFRESH: &str = "/auth/refresh-token";

struct Harness {
    clock: Arc<ManualClock>,
    storage: Arc<MemoryStorage>,
    backend: Arc<FakeBackend>,
    client: AuthenticatedClient<FakeBackend>,
}

impl Harness {
    fn new() -> Self {
        Self::with(StdDuration::ZERO, ClientConfig::new(BASE_URL))
    }

    fn with(latency: StdDuration, config: ClientConfig) -> Self {
        let clock = ManualClock::shared();
        let storage = MemoryStorage::shared();
        let backend = FakeBackend::new(clock.clone())
            .with_latency(latency)
            .shared();
        let tokens = TokenStore::new(storage.clone(), clock.clone(), config.token_policy());
        let client = AuthenticatedClient::new(config, backend.clone(), tokens);
        Self {
            clock,
            storage,
            backend,
            client,
        }
    }

    /// Installs a pair the backend issued, valid for `ttl`.
    async fn logged_in(&self, ttl: Duration) -> TokenPair {
        let pair = self.backend.issue_pair(ttl);
        self.client.tokens().replace_pair(pair.clone()).await.unwrap();
        pair
    }

    fn bearers_sent_to(&self, path: &str) -> Vec<String> {
        self.backend
            .requests()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .filter_map(|r| r.bearer_token().map(str::to_string))
            .collect()
    }
}

fn assert_auth_required(result: Result<impl std::fmt::Debug, ClientError>) {
    match result {
        Err(ClientError::AuthRequired { .. }) => {}
        other => panic!("expected AuthRequired, got {other:?}"),
    }
}

#[tokio::test]
async fn test_valid_token_is_sent_without_refresh() {
    let h = Harness::new();
    let pair = h.logged_in(Duration::minutes(15)).await;

    let response = h
        .client
        .request("/products", RequestOptions::get())
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(
        response.json::<serde_json::Value>().unwrap(),
        json!({ "data": { "path": "/products" } })
    );
    assert_eq!(h.bearers_sent_to("/products"), vec![pair.access_token]);
    assert_eq!(h.backend.calls_to(REFRESH), 0);
}

#[tokio::test]
async fn test_request_carries_json_payload() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;

    h.client
        .request("orders", RequestOptions::post(json!({ "productId": 3 })))
        .await
        .unwrap();

    let sent = h.backend.requests().pop().unwrap();
    assert_eq!(sent.url, format!("{BASE_URL}/orders"));
    assert_eq!(sent.header("content-type"), Some("application/json"));
    assert_eq!(sent.body, Some(json!({ "productId": 3 })));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_expired_requests_share_one_refresh() {
    let h = Harness::with(StdDuration::from_millis(50), ClientConfig::new(BASE_URL));
    let old = h.logged_in(Duration::minutes(15)).await;
    h.clock.advance(Duration::minutes(20));

    let calls = (0..5).map(|_| h.client.request("/products", RequestOptions::get()));
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(h.backend.calls_to(REFRESH), 1);

    let bearers = h.bearers_sent_to("/products");
    assert_eq!(bearers.len(), 5);
    assert!(bearers.iter().all(|b| *b != old.access_token));
    assert!(bearers.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(h.client.tokens().access_token().await.as_ref(), bearers.first());
}

#[tokio::test]
async fn test_revoked_token_is_refreshed_and_retried_once() {
    let h = Harness::new();
    let pair = h.backend.issue_pair(Duration::minutes(15));
    // Locally valid, but the backend never issued it.
    let revoked = jwt_expiring_at(h.clock.now() + Duration::minutes(15));
    h.client
        .tokens()
        .replace_pair(TokenPair::new(revoked.clone(), pair.refresh_token))
        .await
        .unwrap();

    let response = h
        .client
        .request("/products", RequestOptions::get())
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(h.backend.calls_to(REFRESH), 1);
    let bearers = h.bearers_sent_to("/products");
    assert_eq!(bearers.len(), 2);
    assert_eq!(bearers[0], revoked);
    assert_ne!(bearers[1], revoked);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_401s_share_one_refresh() {
    let h = Harness::with(StdDuration::from_millis(50), ClientConfig::new(BASE_URL));
    let pair = h.backend.issue_pair(Duration::minutes(15));
    let revoked = jwt_expiring_at(h.clock.now() + Duration::minutes(15));
    h.client
        .tokens()
        .replace_pair(TokenPair::new(revoked, pair.refresh_token))
        .await
        .unwrap();

    let calls = (0..3).map(|_| h.client.request("/products", RequestOptions::get()));
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(h.backend.calls_to(REFRESH), 1);
    assert_eq!(h.backend.calls_to("/products"), 6);
}

#[tokio::test]
async fn test_expired_refresh_token_fails_without_network() {
    let h = Harness::new();
    let now = h.clock.now();
    h.client
        .tokens()
        .replace_pair(TokenPair::new(
            jwt_expiring_at(now - Duration::minutes(1)),
            jwt_expiring_at(now - Duration::seconds(1)),
        ))
        .await
        .unwrap();

    let result = h.client.request("/products", RequestOptions::get()).await;

    assert_auth_required(result);
    assert!(h.backend.requests().is_empty());
    assert!(h.client.tokens().snapshot().await.is_empty());
    assert_eq!(h.client.tokens().session().await, SessionState::LoggedOut);
    assert_eq!(h.storage.record(), None);
}

#[tokio::test]
async fn test_no_credentials_fails_without_network() {
    let h = Harness::new();

    let result = h.client.request("/products", RequestOptions::get()).await;

    assert_auth_required(result);
    assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn test_missing_access_token_is_refreshed_first() {
    let h = Harness::new();
    let pair = h.backend.issue_pair(Duration::minutes(15));
    h.client
        .tokens()
        .set_refresh_token(pair.refresh_token)
        .await
        .unwrap();
    assert_eq!(h.client.tokens().session().await, SessionState::NeedsRefresh);

    h.client
        .request("/products", RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(h.backend.calls_to(REFRESH), 1);
    assert_eq!(h.backend.calls_to("/products"), 1);
    assert!(h.client.tokens().is_logged_in().await);
}

#[tokio::test]
async fn test_401_after_retry_is_terminal() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;
    h.backend.reject_every_token();

    let result = h.client.request("/products", RequestOptions::get()).await;

    assert_auth_required(result);
    assert_eq!(h.backend.calls_to(REFRESH), 1);
    assert_eq!(h.backend.calls_to("/products"), 2);
    assert!(h.client.tokens().snapshot().await.is_empty());
}

#[tokio::test]
async fn test_401_after_preflight_refresh_is_retried_once() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;
    h.clock.advance(Duration::minutes(20));
    h.backend.reject_next(1);

    h.client
        .request("/products", RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(h.backend.calls_to(REFRESH), 2);
    assert_eq!(h.backend.calls_to("/products"), 2);
    let bearers = h.bearers_sent_to("/products");
    assert_ne!(bearers[0], bearers[1]);
    assert!(h.client.tokens().is_logged_in().await);
}

#[tokio::test]
async fn test_401_on_retry_after_preflight_refresh_is_terminal() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;
    h.clock.advance(Duration::minutes(20));
    h.backend.reject_every_token();

    let result = h.client.request("/products", RequestOptions::get()).await;

    assert_auth_required(result);
    assert_eq!(h.backend.calls_to(REFRESH), 2);
    assert_eq!(h.backend.calls_to("/products"), 2);
    assert_eq!(h.storage.record(), None);
}

#[tokio::test]
async fn test_foreign_host_gets_no_credentials() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;

    let result = h
        .client
        .request("https://elsewhere.test/steal", RequestOptions::get())
        .await;

    match result {
        Err(ClientError::InvalidEndpoint(endpoint)) => {
            assert_eq!(endpoint, "https://elsewhere.test/steal");
        }
        other => panic!("expected InvalidEndpoint, got {other:?}"),
    }
    assert!(h.backend.requests().is_empty());
    assert!(h.client.tokens().is_logged_in().await);
}

#[tokio::test]
async fn test_absolute_url_on_base_origin_is_allowed() {
    let h = Harness::new();
    let pair = h.logged_in(Duration::minutes(15)).await;

    h.client
        .request(&format!("{BASE_URL}/products"), RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(h.bearers_sent_to("/products"), vec![pair.access_token]);
}

#[tokio::test]
async fn test_refresh_rejection_clears_session() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;
    h.clock.advance(Duration::minutes(20));
    h.backend.fail_refresh_with(500);
    let mut session = h.client.tokens().subscribe();

    let result = h.client.request("/products", RequestOptions::get()).await;

    assert_auth_required(result);
    assert_eq!(h.backend.calls_to("/products"), 0);
    assert!(h.client.tokens().snapshot().await.is_empty());
    assert_eq!(h.storage.record(), None);
    assert!(session.has_changed().unwrap());
    assert_eq!(*session.borrow_and_update(), SessionState::LoggedOut);
}

#[tokio::test]
async fn test_unreachable_refresh_endpoint_requires_login() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;
    h.clock.advance(Duration::minutes(20));
    h.backend.make_refresh_unreachable();

    let result = h.client.request("/products", RequestOptions::get()).await;

    assert_auth_required(result);
    assert!(h.client.tokens().snapshot().await.is_empty());
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored_with_access_token() {
    let h = Harness::new();
    let old = h.logged_in(Duration::minutes(15)).await;
    h.backend.rotate_refresh_tokens(true);
    h.clock.advance(Duration::minutes(20));

    h.client
        .request("/products", RequestOptions::get())
        .await
        .unwrap();

    let held = h.client.tokens().snapshot().await;
    assert_ne!(held.refresh_token.as_deref(), Some(old.refresh_token.as_str()));
    assert_eq!(held.refresh_token, h.backend.current_refresh_token());

    let record = h.storage.record().unwrap();
    assert_eq!(record.access_token, held.access_token);
    assert_eq!(record.refresh_token, held.refresh_token);
}

#[tokio::test]
async fn test_unrotated_refresh_keeps_refresh_token() {
    let h = Harness::new();
    let old = h.logged_in(Duration::minutes(15)).await;
    h.clock.advance(Duration::minutes(20));

    h.client.refresh().await.unwrap();

    let held = h.client.tokens().snapshot().await;
    assert_eq!(held.refresh_token, Some(old.refresh_token));
    assert_ne!(held.access_token, Some(old.access_token));
}

#[tokio::test]
async fn test_other_failures_keep_session() {
    let h = Harness::new();
    let pair = h.logged_in(Duration::minutes(15)).await;

    let missing = h
        .client
        .request("/products/missing", RequestOptions::get())
        .await
        .unwrap_err();
    match missing {
        ClientError::RequestRejected {
            status, message, ..
        } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(message, "Product not found");
        }
        other => panic!("expected RequestRejected, got {other:?}"),
    }

    let invalid = h
        .client
        .request("/cart", RequestOptions::post(json!({ "quantity": 0 })))
        .await
        .unwrap_err();
    let ClientError::RequestRejected { field_errors, .. } = invalid else {
        panic!("expected RequestRejected");
    };
    assert_eq!(
        field_errors.get("quantity").map(String::as_str),
        Some("Quantity must be positive")
    );

    assert_eq!(h.backend.calls_to(REFRESH), 0);
    assert_eq!(h.client.tokens().access_token().await, Some(pair.access_token));
}

#[tokio::test]
async fn test_transport_failure_keeps_session() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;
    h.backend.go_offline();

    let err = h
        .client
        .request("/products", RequestOptions::get())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)));
    assert!(!err.requires_login());
    assert!(h.client.tokens().is_logged_in().await);
}

#[tokio::test]
async fn test_request_data_unwraps_envelope() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;

    let data: serde_json::Value = h
        .client
        .request_data("/products", RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(data, json!({ "path": "/products" }));
}

#[tokio::test]
async fn test_login_stores_pair() {
    let h = Harness::new();

    h.client
        .login(&LoginCredentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();

    let login = h.backend.requests().pop().unwrap();
    assert_eq!(login.bearer_token(), None);
    assert_eq!(login.body, Some(json!({ "email": EMAIL, "password": PASSWORD })));
    assert!(matches!(
        h.client.tokens().session().await,
        SessionState::Active { .. }
    ));
    assert!(h.storage.record().is_some());

    let user = h.client.me().await.unwrap();
    assert_eq!(user.email, EMAIL);
    assert_eq!(user.name, "Ada");
}

#[tokio::test]
async fn test_login_rejection_reports_fields() {
    let h = Harness::new();

    let err = h
        .client
        .login(&LoginCredentials::new(EMAIL, "wrong"))
        .await
        .unwrap_err();

    let ClientError::RequestRejected {
        message,
        field_errors,
        ..
    } = err
    else {
        panic!("expected RequestRejected");
    };
    assert_eq!(
        message,
        "Error: Invalid email or password (Field: password)"
    );
    assert_eq!(
        field_errors.get("password").map(String::as_str),
        Some("Invalid email or password")
    );
    assert!(!h.client.tokens().is_logged_in().await);
}

#[tokio::test]
async fn test_register() {
    let h = Harness::new();
    let mut registration = Registration {
        name: "Grace".to_string(),
        email: "grace@example.com".to_string(),
        password: PASSWORD.to_string(),
        confirm_password: PASSWORD.to_string(),
        address: "1 Main St".to_string(),
        phone: "555-0100".to_string(),
    };

    h.client.register(&registration).await.unwrap();
    let sent = h.backend.requests().pop().unwrap();
    assert_eq!(sent.body.unwrap()["confirmPassword"], PASSWORD);
    assert!(!h.client.tokens().is_logged_in().await);

    registration.email = EMAIL.to_string();
    let err = h.client.register(&registration).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(409));
}

#[tokio::test]
async fn test_logout_revokes_and_clears() {
    let h = Harness::new();
    let pair = h.logged_in(Duration::minutes(15)).await;

    h.client.logout().await.unwrap();

    let sent = h.backend.requests().pop().unwrap();
    assert!(sent.url.ends_with("/auth/logout"));
    assert_eq!(sent.body, Some(json!({ "refreshToken": pair.refresh_token })));
    assert_eq!(h.backend.current_refresh_token(), None);
    assert!(h.client.tokens().snapshot().await.is_empty());
    assert_eq!(h.storage.record(), None);
}

#[tokio::test]
async fn test_logout_clears_even_when_offline() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;
    h.backend.go_offline();

    h.client.logout().await.unwrap();

    assert!(h.client.tokens().snapshot().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_background_refresh_renews_before_expiry() {
    let mut config = ClientConfig::new(BASE_URL);
    config.background_refresh_secs = Some(60);
    let h = Harness::with(StdDuration::ZERO, config);
    // Valid now, gone before the next tick.
    let pair = h.logged_in(Duration::seconds(45)).await;

    let handle = h.client.spawn_background_refresh().unwrap();
    tokio::time::sleep(StdDuration::from_secs(61)).await;
    handle.abort();

    assert_eq!(h.backend.calls_to(REFRESH), 1);
    assert_ne!(h.client.tokens().access_token().await, Some(pair.access_token));
}

#[tokio::test(start_paused = true)]
async fn test_background_refresh_skips_long_lived_token() {
    let mut config = ClientConfig::new(BASE_URL);
    config.background_refresh_secs = Some(60);
    let h = Harness::with(StdDuration::ZERO, config);
    h.logged_in(Duration::minutes(15)).await;

    let handle = h.client.spawn_background_refresh().unwrap();
    tokio::time::sleep(StdDuration::from_secs(61)).await;
    handle.abort();

    assert_eq!(h.backend.calls_to(REFRESH), 0);
}

#[test]
fn test_background_refresh_disabled_by_default() {
    let h = Harness::new();
    assert!(h.client.spawn_background_refresh().is_none());
}

#[tokio::test]
async fn test_debug_output_hides_tokens() {
    let h = Harness::new();
    h.logged_in(Duration::minutes(15)).await;

    let token = h.client.tokens().access_token().await.unwrap();
    let rendered = format!("{:?}", h.client.tokens());
    assert!(rendered.contains("Active"));
    assert!(!rendered.contains(&token));
}
