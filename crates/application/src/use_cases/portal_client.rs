//! Portal client: the cached, authenticated operations the view layer calls.

use std::sync::Arc;

use portal_domain::{ApiRequest, ApiResponse, Credentials, UserProfile};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::SessionGuard;
use crate::cache::ScopedCache;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApplicationResult};
use crate::pipeline::RequestPipeline;
use crate::ports::{Clock, HttpTransport};

/// Entry point of the API client.
///
/// Reads go through the scoped cache; writes go straight to the backend and
/// evict what they affect. The event and gallery operations live in their
/// own modules.
pub struct PortalClient {
    pub(super) pipeline: RequestPipeline,
    pub(super) cache: ScopedCache,
}

impl PortalClient {
    /// Creates a client for the session of `guard`, with an empty cache.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        guard: SessionGuard,
        clock: Arc<dyn Clock>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            pipeline: RequestPipeline::new(transport, guard, clock.clone(), config),
            cache: ScopedCache::new(config.cache_ttl, clock),
        }
    }

    /// The session guard.
    #[must_use]
    pub const fn guard(&self) -> &SessionGuard {
        self.pipeline.guard()
    }

    /// The read cache.
    #[must_use]
    pub const fn cache(&self) -> &ScopedCache {
        &self.cache
    }

    /// The underlying pipeline, for requests without a dedicated operation.
    #[must_use]
    pub const fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// Logs in, starting from an empty cache.
    ///
    /// # Errors
    ///
    /// See [`SessionGuard::login`].
    pub async fn login(&self, credentials: &Credentials) -> ApplicationResult<UserProfile> {
        self.cache.invalidate_all();
        self.guard().login(credentials).await
    }

    /// Logs out and drops everything cached for the session. Idempotent.
    pub async fn logout(&self) {
        self.guard().logout().await;
        self.cache.invalidate_all();
    }

    /// Sends `request` and decodes its body.
    pub(super) async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApplicationResult<T> {
        let result = self.pipeline.send_json(request).await;
        self.after_call(result)
    }

    /// Sends `request`, ignoring its body.
    pub(super) async fn execute(&self, request: &ApiRequest) -> ApplicationResult<ApiResponse> {
        let result = self.pipeline.send(request).await;
        self.after_call(result)
    }

    fn after_call<T>(&self, result: ApplicationResult<T>) -> ApplicationResult<T> {
        if let Err(e) = &result
            && e.is_session_expired()
        {
            debug!("session expired, clearing cache");
            self.cache.invalidate_all();
        }
        result
    }
}

pub(super) fn encode_error(error: &serde_json::Error) -> ApiError {
    ApiError::Encode(error.to_string())
}
