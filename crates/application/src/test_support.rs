//! In-memory doubles shared by the unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use storefront_domain::{ApiRequest, ApiResponse, TokenPair};
use tokio::sync::watch;

use crate::ports::{
    Clock, CredentialStorage, HttpTransport, StorageError, StoredCredentials, TransportError,
};

static TOKEN_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Builds an unsigned JWT whose payload carries `exp`. Every call yields a
/// distinct token, even for the same expiry.
pub fn jwt_expiring_at(exp: DateTime<Utc>) -> String {
    let serial = TOKEN_SERIAL.fetch_add(1, Ordering::Relaxed);
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({ "sub": 1, "exp": exp.timestamp(), "jti": serial })
            .to_string()
            .as_bytes(),
    );
    format!("{header}.{payload}.signature")
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn shared() -> Arc<Self> {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap();
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Credential medium held in memory, with switchable write failures.
pub struct MemoryStorage {
    record: Mutex<Option<StoredCredentials>>,
    fail_writes: AtomicBool,
    revision: watch::Sender<u64>,
}

impl MemoryStorage {
    pub fn shared() -> Arc<Self> {
        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            record: Mutex::new(None),
            fail_writes: AtomicBool::new(false),
            revision,
        })
    }

    pub fn record(&self) -> Option<StoredCredentials> {
        self.record.lock().unwrap().clone()
    }

    /// Writes a record as another client instance would.
    pub fn put(&self, record: StoredCredentials) {
        *self.record.lock().unwrap() = Some(record);
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io("disk full".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<StoredCredentials>, StorageError> {
        Ok(self.record())
    }

    async fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError> {
        self.check_writable()?;
        *self.record.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check_writable()?;
        *self.record.lock().unwrap() = None;
        Ok(())
    }

    fn watch(&self) -> Option<watch::Receiver<u64>> {
        Some(self.revision.subscribe())
    }
}

pub const BASE_URL: &str = "http://storefront.test";
pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct horse";

#[derive(Default)]
struct BackendState {
    accepted_access: HashSet<String>,
    refresh_token: Option<String>,
    rotate_refresh: bool,
    refresh_failure: Option<u16>,
    refresh_unreachable: bool,
    offline: bool,
    reject_every_token: bool,
    reject_next: usize,
    requests: Vec<ApiRequest>,
}

/// Scripted storefront backend speaking the `/auth` protocol.
///
/// Protected routes accept any access token it issued that has not yet
/// expired on the shared [`ManualClock`]; everything else gets `401`.
pub struct FakeBackend {
    clock: Arc<ManualClock>,
    latency: StdDuration,
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            latency: StdDuration::ZERO,
            state: Mutex::new(BackendState::default()),
        }
    }

    /// Delays every answer, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: StdDuration) -> Self {
        self.latency = latency;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Issues an access token valid for `ttl` plus a day-long refresh
    /// token, as a login would.
    pub fn issue_pair(&self, ttl: Duration) -> TokenPair {
        let now = self.clock.now();
        let access = jwt_expiring_at(now + ttl);
        let refresh = jwt_expiring_at(now + Duration::days(1));
        let mut state = self.state.lock().unwrap();
        state.accepted_access.insert(access.clone());
        state.refresh_token = Some(refresh.clone());
        TokenPair::new(access, refresh)
    }

    pub fn rotate_refresh_tokens(&self, rotate: bool) {
        self.state.lock().unwrap().rotate_refresh = rotate;
    }

    pub fn fail_refresh_with(&self, status: u16) {
        self.state.lock().unwrap().refresh_failure = Some(status);
    }

    pub fn make_refresh_unreachable(&self) {
        self.state.lock().unwrap().refresh_unreachable = true;
    }

    /// Fails every call at the connection level.
    pub fn go_offline(&self) {
        self.state.lock().unwrap().offline = true;
    }

    /// Answers `401` to every protected call, even with a fresh token.
    pub fn reject_every_token(&self) {
        self.state.lock().unwrap().reject_every_token = true;
    }

    /// Answers `401` to the next `calls` protected calls, as a replica
    /// that has not yet seen a fresh token would.
    pub fn reject_next(&self, calls: usize) {
        self.state.lock().unwrap().reject_next = calls;
    }

    pub fn current_refresh_token(&self) -> Option<String> {
        self.state.lock().unwrap().refresh_token.clone()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .count()
    }

    fn answer(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let path = request.url.strip_prefix(BASE_URL).unwrap_or(&request.url);
        match path {
            "/auth/login" => Ok(self.login(request.body.as_ref())),
            "/auth/register" => Ok(Self::register(request.body.as_ref())),
            "/auth/refresh-token" => self.refresh(request.body.as_ref()),
            "/auth/logout" => {
                self.state.lock().unwrap().refresh_token = None;
                Ok(ApiResponse::json_body(200, &json!({ "data": "ok" })))
            }
            _ => Ok(self.protected(path, request)),
        }
    }

    fn login(&self, body: Option<&Value>) -> ApiResponse {
        let body = body.cloned().unwrap_or_default();
        if body["email"] == EMAIL && body["password"] == PASSWORD {
            let pair = self.issue_pair(Duration::minutes(15));
            return ApiResponse::json_body(
                200,
                &json!({ "accessToken": pair.access_token, "refreshToken": pair.refresh_token }),
            );
        }
        ApiResponse::json_body(
            400,
            &json!({ "error": { "issues": [
                { "message": "Invalid email or password", "path": ["password"] }
            ] } }),
        )
    }

    fn register(body: Option<&Value>) -> ApiResponse {
        let body = body.cloned().unwrap_or_default();
        if body["email"] == EMAIL {
            return ApiResponse::json_body(
                409,
                &json!({ "error": { "issues": [
                    { "message": "Email already registered", "path": ["email"] }
                ] } }),
            );
        }
        ApiResponse::json_body(201, &json!({ "data": { "id": 2 } }))
    }

    fn refresh(&self, body: Option<&Value>) -> Result<ApiResponse, TransportError> {
        let presented = body
            .and_then(|b| b["refreshToken"].as_str())
            .map(str::to_string);
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        if state.refresh_unreachable {
            return Err(TransportError::ConnectionFailed("connection reset".to_string()));
        }
        if let Some(status) = state.refresh_failure {
            return Ok(ApiResponse::json_body(
                status,
                &json!({ "error": "Refresh failed" }),
            ));
        }
        if presented.is_none() || presented != state.refresh_token {
            return Ok(ApiResponse::json_body(
                401,
                &json!({ "error": "Invalid refresh token" }),
            ));
        }

        let access = jwt_expiring_at(now + Duration::minutes(15));
        state.accepted_access.insert(access.clone());
        if state.rotate_refresh {
            let refresh = jwt_expiring_at(now + Duration::days(1));
            state.refresh_token = Some(refresh.clone());
            return Ok(ApiResponse::json_body(
                200,
                &json!({ "accessToken": access, "refreshToken": refresh }),
            ));
        }
        Ok(ApiResponse::json_body(200, &json!({ "accessToken": access })))
    }

    fn protected(&self, path: &str, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state.lock().unwrap();
        if state.reject_next > 0 {
            state.reject_next -= 1;
            return ApiResponse::json_body(401, &json!({ "error": "Unauthorized" }));
        }
        let authorized = !state.reject_every_token
            && request.bearer_token().is_some_and(|token| {
                state.accepted_access.contains(token)
                    && !storefront_domain::is_expired_at(token, self.clock.now(), 0)
            });
        if !authorized {
            return ApiResponse::json_body(401, &json!({ "error": "Unauthorized" }));
        }
        match path {
            "/auth/me" => ApiResponse::json_body(
                200,
                &json!({ "data": { "id": 1, "name": "Ada", "email": EMAIL } }),
            ),
            "/products/missing" => {
                ApiResponse::json_body(404, &json!({ "error": "Product not found" }))
            }
            "/cart" => ApiResponse::json_body(
                422,
                &json!({ "error": { "issues": [
                    { "message": "Quantity must be positive", "path": ["quantity"] }
                ] } }),
            ),
            _ => ApiResponse::json_body(200, &json!({ "data": { "path": path } })),
        }
    }
}

impl HttpTransport for FakeBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let offline = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state.offline
        };
        if offline {
            return Err(TransportError::ConnectionRefused {
                host: "storefront.test".to_string(),
                port: 80,
            });
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.answer(request)
    }
}
