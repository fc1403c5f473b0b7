//! Authenticated request pipeline.
//!
//! Attaches the session's bearer token to every request, replays a request
//! once after a 401 with a refreshed token, and ends the session when the
//! backend keeps refusing it.

use std::sync::Arc;
use std::time::Duration;

use portal_domain::{AccessToken, ApiRequest, ApiResponse};
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::auth::SessionGuard;
use crate::config::{CACHE_BUSTING_PARAM, ClientConfig};
use crate::error::{ApiError, ApplicationResult, SessionError};
use crate::ports::{Clock, HttpTransport, OutboundRequest, TransportError};

/// Sends requests on behalf of the session held by a [`SessionGuard`].
pub struct RequestPipeline {
    transport: Arc<dyn HttpTransport>,
    guard: SessionGuard,
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
    cache_busting: bool,
}

impl RequestPipeline {
    /// Creates a pipeline sending through `transport` as the session of `guard`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        guard: SessionGuard,
        clock: Arc<dyn Clock>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            transport,
            guard,
            clock,
            request_timeout: config.request_timeout,
            cache_busting: config.cache_busting,
        }
    }

    /// The guard whose session authenticates the requests.
    #[must_use]
    pub const fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    /// Sends `request` and returns its 2xx response.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Invalid`] if the request is malformed (nothing is sent)
    /// - [`ApiError::Network`] on timeout or connection failure
    /// - [`ApiError::SessionExpired`] if the session could not be kept alive;
    ///   the session has been ended by then
    /// - [`ApiError::Status`] for any other non-2xx answer
    pub async fn send(&self, request: &ApiRequest) -> ApplicationResult<ApiResponse> {
        request.validate()?;

        let span = info_span!(
            "api_request",
            request_id = %Uuid::now_v7(),
            method = %request.method,
            path = %request.path,
        );
        self.send_authenticated(request).instrument(span).await
    }

    /// Sends `request` and decodes the JSON body of its response.
    ///
    /// # Errors
    ///
    /// Everything [`send`](Self::send) returns, plus [`ApiError::Decode`]
    /// when the body does not match `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApplicationResult<T> {
        let response = self.send(request).await?;
        response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_authenticated(&self, request: &ApiRequest) -> ApplicationResult<ApiResponse> {
        let token = self.current_token().await?;
        let mut response = self.dispatch(request, token.as_ref()).await?;

        if response.is_unauthorized() {
            debug!("access token rejected, refreshing and replaying once");
            let rejected = token.as_ref().map(|t| t.value.as_str());
            let fresh = match self.guard.force_refresh(rejected).await {
                Ok(fresh) => fresh,
                Err(e) => return Err(self.session_lost(e).await),
            };

            response = self.dispatch(request, Some(&fresh)).await?;
            if response.is_unauthorized() {
                warn!("refreshed access token rejected as well");
                return Err(self.session_lost(SessionError::Unauthorized).await);
            }
        }

        if !response.is_success() {
            debug!(status = response.status, "request failed");
            return Err(ApiError::Status {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response)
    }

    async fn current_token(&self) -> ApplicationResult<Option<AccessToken>> {
        if !self.guard.is_expiring() {
            return Ok(self.guard.access_token());
        }
        match self.guard.ensure_fresh().await {
            Ok(token) => Ok(Some(token)),
            Err(e) => Err(self.session_lost(e).await),
        }
    }

    async fn session_lost(&self, error: SessionError) -> ApiError {
        self.guard.expire().await;
        ApiError::SessionExpired(error)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> ApplicationResult<ApiResponse> {
        let timeout = request.timeout.unwrap_or(self.request_timeout);
        let mut outbound =
            OutboundRequest::from_request(request, token.map(|t| t.value.clone()), timeout);
        if self.cache_busting && request.method.is_read() {
            outbound = outbound.with_query(
                CACHE_BUSTING_PARAM,
                self.clock.now().timestamp_millis().to_string(),
            );
        }

        match tokio::time::timeout(timeout, self.transport.dispatch(&outbound)).await {
            Ok(Ok(response)) => {
                debug!(
                    status = response.status,
                    elapsed = ?response.duration,
                    "response received"
                );
                Ok(response)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "request did not reach the backend");
                Err(e.into())
            }
            Err(_) => {
                warn!(?timeout, "request timed out");
                Err(TransportError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
                .into())
            }
        }
    }
}
