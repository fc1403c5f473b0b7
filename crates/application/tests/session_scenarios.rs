//! End-to-end session scenarios against in-process backends.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use portal_application::ports::{
    AuthBackendError, LoginGrant, ManualClock, MemorySessionRepository, OutboundRequest,
    RefreshGrant, TransportError,
};
use portal_application::{
    AuthBackend, ClientConfig, HttpTransport, LogoutReason, PortalClient, RefreshFailure,
    SessionError, SessionEvent, SessionGuard,
};
use portal_domain::{ApiResponse, Credentials, EventId, EventQuery, GalleryQuery};
use serde_json::json;

/// Issues `access-N` tokens; the refresh token can be revoked.
struct TokenServer {
    refresh_calls: AtomicUsize,
    revoked: bool,
    latency: Duration,
}

impl TokenServer {
    fn new(revoked: bool) -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            revoked,
            latency: Duration::from_millis(50),
        }
    }

    fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for TokenServer {
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, AuthBackendError> {
        Ok(LoginGrant {
            access: "access-1".to_string(),
            refresh: Some(format!("refresh-for-{}", credentials.username)),
            user: None,
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<RefreshGrant, AuthBackendError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.revoked {
            return Err(AuthBackendError::Rejected {
                status: 401,
                message: "Token is blacklisted".to_string(),
            });
        }
        Ok(RefreshGrant::access_only(format!("access-{}", n + 2)))
    }
}

/// Accepts exactly one bearer token; records what it saw.
struct DataServer {
    accepted: String,
    seen: Mutex<Vec<Option<String>>>,
}

impl DataServer {
    fn accepting(token: &str) -> Self {
        Self {
            accepted: token.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpTransport for DataServer {
    async fn dispatch(&self, request: &OutboundRequest) -> Result<ApiResponse, TransportError> {
        self.seen.lock().push(request.bearer.clone());
        if request.bearer.as_deref() != Some(self.accepted.as_str()) {
            return Ok(ApiResponse::json_body(401, &json!({"detail": "expired"})));
        }
        let body = match request.path.as_str() {
            "/events" => json!({"count": 0, "results": []}),
            "/galleries" => json!([]),
            _ => json!({"id": 42, "title": "Gala"}),
        };
        Ok(ApiResponse::json_body(200, &body))
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

async fn logged_in_client(
    tokens: Arc<TokenServer>,
    data: Arc<DataServer>,
    clock: Arc<ManualClock>,
) -> PortalClient {
    let config = ClientConfig::default();
    let guard = SessionGuard::new(
        tokens,
        Arc::new(MemorySessionRepository::new()),
        clock.clone(),
        &config,
    );
    let client = PortalClient::new(data, guard, clock, &config);
    client
        .login(&Credentials::new("admin", "secret"))
        .await
        .unwrap();
    client
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fetches_after_56_minutes_share_one_refresh() {
    let tokens = Arc::new(TokenServer::new(false));
    let data = Arc::new(DataServer::accepting("access-2"));
    let clock = Arc::new(ManualClock::new(t0()));
    let client = Arc::new(logged_in_client(tokens.clone(), data.clone(), clock.clone()).await);

    clock.advance(Duration::from_secs(56 * 60));
    assert!(client.guard().is_expiring());

    let events = tokio::spawn({
        let client = client.clone();
        async move { client.list_events(&EventQuery::default()).await.map(|_| ()) }
    });
    let event = tokio::spawn({
        let client = client.clone();
        async move { client.get_event(EventId(42)).await.map(|_| ()) }
    });
    let galleries = tokio::spawn({
        let client = client.clone();
        async move { client.list_galleries(&GalleryQuery::default()).await.map(|_| ()) }
    });

    events.await.unwrap().unwrap();
    event.await.unwrap().unwrap();
    galleries.await.unwrap().unwrap();

    assert_eq!(tokens.refreshes(), 1);
    let seen = data.seen.lock().clone();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|b| b.as_deref() == Some("access-2")));
    assert_eq!(client.guard().access_token().unwrap().value, "access-2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_callers_trigger_a_single_refresh() {
    let tokens = Arc::new(TokenServer::new(false));
    let clock = Arc::new(ManualClock::new(t0()));
    let client = logged_in_client(
        tokens.clone(),
        Arc::new(DataServer::accepting("access-2")),
        clock.clone(),
    )
    .await;
    let guard = client.guard().clone();
    clock.advance(Duration::from_secs(60 * 60));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let guard = guard.clone();
            tokio::spawn(async move { guard.ensure_fresh().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().value, "access-2");
    }
    assert_eq!(tokens.refreshes(), 1);
}

#[tokio::test]
async fn test_revoked_refresh_token_ends_the_session() {
    let tokens = Arc::new(TokenServer::new(true));
    let clock = Arc::new(ManualClock::new(t0()));
    let client = logged_in_client(
        tokens.clone(),
        Arc::new(DataServer::accepting("access-1")),
        clock.clone(),
    )
    .await;
    let mut events = client.guard().subscribe();
    clock.advance(Duration::from_secs(57 * 60));

    let err = client.guard().ensure_fresh().await.unwrap_err();

    assert_eq!(
        err,
        SessionError::RefreshRejected(RefreshFailure::Rejected {
            status: 401,
            message: "Token is blacklisted".to_string(),
        })
    );
    assert!(!client.guard().is_authenticated());
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            reason: LogoutReason::SessionExpired
        }
    );
}

#[tokio::test]
async fn test_rejected_token_is_replayed_at_most_once() {
    let tokens = Arc::new(TokenServer::new(false));
    let data = Arc::new(DataServer::accepting("never-issued"));
    let client = logged_in_client(
        tokens.clone(),
        data.clone(),
        Arc::new(ManualClock::new(t0())),
    )
    .await;

    let err = client.get_event(EventId(42)).await.unwrap_err();

    assert!(err.is_session_expired());
    assert_eq!(tokens.refreshes(), 1);
    assert_eq!(
        *data.seen.lock(),
        vec![Some("access-1".to_string()), Some("access-2".to_string())]
    );
    assert!(!client.guard().is_authenticated());
}
