//! Scripted ports shared by the unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use portal_domain::{ApiResponse, Credentials, HttpMethod, UserProfile};
use serde_json::{Value, json};

use crate::ports::{
    AuthBackend, AuthBackendError, HttpTransport, LoginGrant, ManualClock,
    MemorySessionRepository, OutboundRequest, RefreshGrant, TransportError,
};
use crate::{ClientConfig, PortalClient, SessionGuard};

pub fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

/// Auth backend answering from a script.
///
/// Refresh results are consumed in order; once the script runs out every
/// refresh is rejected with a 401.
pub struct ScriptedBackend {
    login: Mutex<Result<LoginGrant, AuthBackendError>>,
    refreshes: Mutex<VecDeque<Result<RefreshGrant, AuthBackendError>>>,
    refresh_delay: Duration,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    last_refresh_token: Mutex<Option<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            login: Mutex::new(Ok(LoginGrant {
                access: "access-1".to_string(),
                refresh: Some("refresh-1".to_string()),
                user: Some(UserProfile::new("admin")),
            })),
            refreshes: Mutex::new(VecDeque::new()),
            refresh_delay: Duration::ZERO,
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            last_refresh_token: Mutex::new(None),
        }
    }

    pub fn with_login(self, result: Result<LoginGrant, AuthBackendError>) -> Self {
        *self.login.lock() = result;
        self
    }

    pub fn with_refresh(self, result: Result<RefreshGrant, AuthBackendError>) -> Self {
        self.refreshes.lock().push_back(result);
        self
    }

    pub const fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token.lock().clone()
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginGrant, AuthBackendError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login.lock().clone()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, AuthBackendError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock() = Some(refresh_token.to_string());
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        let next = self.refreshes.lock().pop_front();
        next.unwrap_or_else(|| {
            Err(AuthBackendError::Rejected {
                status: 401,
                message: "token revoked".to_string(),
            })
        })
    }
}

type Handler = dyn Fn(&OutboundRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Transport answering through a closure and recording every request.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    delay: Duration,
    read_delay: Duration,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&OutboundRequest) -> Result<ApiResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            read_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers `body` with 200 to requests bearing one of `tokens`, 401 otherwise.
    pub fn accepting(tokens: &[&str], body: Value) -> Self {
        let tokens: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        Self::new(move |request| {
            let authorized = request
                .bearer
                .as_ref()
                .is_some_and(|bearer| tokens.contains(bearer));
            if authorized {
                Ok(ApiResponse::json_body(200, &body))
            } else {
                Ok(ApiResponse::json_body(
                    401,
                    &json!({"detail": "token not valid"}),
                ))
            }
        })
    }

    /// Delays every answer, e.g. to keep requests in flight concurrently.
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delays only the answers to reads, on top of any `with_delay`.
    pub const fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn recorded(&self) -> Vec<OutboundRequest> {
        self.requests.lock().clone()
    }

    pub fn bearers(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.bearer.clone())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn dispatch(&self, request: &OutboundRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request.clone());
        let delay = if request.method.is_read() {
            self.delay + self.read_delay
        } else {
            self.delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(request)
    }
}

/// Answers like a small portal backend holding event 1 and gallery 7.
pub fn portal_routes(request: &OutboundRequest) -> Result<ApiResponse, TransportError> {
    let (status, body) = match (request.method, request.path.as_str()) {
        (HttpMethod::Get, "/events") => (
            200,
            json!({"count": 1, "results": [{"id": 1, "title": "Gala", "status": "published"}]}),
        ),
        (HttpMethod::Get, "/events/1") => (200, json!({"id": 1, "title": "Gala", "galleries": [7]})),
        (HttpMethod::Post, "/events") => {
            let title = request
                .body
                .as_ref()
                .and_then(|b| b.get("title"))
                .cloned()
                .unwrap_or(Value::Null);
            (201, json!({"id": 2, "title": title}))
        }
        (HttpMethod::Put, "/events/1") => (200, json!({"id": 1, "title": "Renamed"})),
        (HttpMethod::Delete, "/events/1" | "/galleries/7") => {
            return Ok(ApiResponse {
                status: 204,
                ..ApiResponse::default()
            });
        }
        (HttpMethod::Get, "/galleries") => (
            200,
            json!([{"id": 7, "title": "Backstage", "event": 1, "image_count": 12}]),
        ),
        (HttpMethod::Post, "/galleries") => (201, json!({"id": 8, "title": "New"})),
        _ => (404, json!({"detail": "not found"})),
    };
    Ok(ApiResponse::json_body(status, &body))
}

pub struct PortalFixture {
    pub client: PortalClient,
    pub transport: Arc<ScriptedTransport>,
    pub backend: Arc<ScriptedBackend>,
    pub clock: Arc<ManualClock>,
}

impl PortalFixture {
    /// A logged-in client in front of `transport`.
    pub async fn new(transport: ScriptedTransport, backend: ScriptedBackend) -> Self {
        let config = ClientConfig::default();
        let transport = Arc::new(transport);
        let backend = Arc::new(backend);
        let clock = Arc::new(ManualClock::new(t0()));
        let guard = SessionGuard::new(
            backend.clone(),
            Arc::new(MemorySessionRepository::new()),
            clock.clone(),
            &config,
        );
        let client = PortalClient::new(transport.clone(), guard, clock.clone(), &config);
        client
            .login(&Credentials::new("admin", "secret"))
            .await
            .unwrap();
        Self {
            client,
            transport,
            backend,
            clock,
        }
    }

    pub async fn portal() -> Self {
        Self::new(ScriptedTransport::new(portal_routes), ScriptedBackend::new()).await
    }

    /// Requests sent so far as `METHOD /path` strings.
    pub fn sent(&self) -> Vec<String> {
        self.transport
            .recorded()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}
