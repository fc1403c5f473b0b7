//! Token endpoints of the portal backend.
//!
//! `POST /login` exchanges credentials for a token pair and the user record;
//! `POST /token/refresh` exchanges the refresh token for a new access token.
//! Both go through the same `HttpTransport` as data requests, without a
//! bearer token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use portal_application::ports::{
    AuthBackend, AuthBackendError, HttpTransport, LoginGrant, OutboundRequest, RefreshGrant,
};
use portal_domain::{ApiRequest, ApiResponse, Credentials, UserProfile};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::serialization::from_json_bytes;

/// Path of the login endpoint.
pub const LOGIN_PATH: &str = "/login";

/// Path of the refresh endpoint.
pub const REFRESH_PATH: &str = "/token/refresh";

/// Successful `/login` payload.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// Successful `/token/refresh` payload. Some backends rotate the refresh token.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Error payload; backends disagree on the field name.
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    non_field_errors: Vec<String>,
}

impl ErrorResponse {
    fn into_message(self) -> Option<String> {
        self.detail
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .or_else(|| self.non_field_errors.into_iter().next())
    }
}

/// `AuthBackend` talking to the portal's token endpoints.
pub struct HttpAuthBackend {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl HttpAuthBackend {
    /// Creates a backend sending through `transport`.
    ///
    /// `timeout` bounds each exchange at the transport level; the session
    /// guard applies its own refresh timeout on top.
    #[must_use]
    pub const fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, AuthBackendError> {
        let request = OutboundRequest::from_request(&ApiRequest::post(path, body), None, self.timeout);
        let response = self.transport.dispatch(&request).await?;

        if !response.is_success() {
            let message = rejection_message(&response);
            debug!(path, status = response.status, %message, "token endpoint rejected the call");
            return Err(AuthBackendError::Rejected {
                status: response.status,
                message,
            });
        }

        from_json_bytes(&response.body).map_err(|e| AuthBackendError::InvalidResponse(e.to_string()))
    }
}

fn rejection_message(response: &ApiResponse) -> String {
    from_json_bytes::<ErrorResponse>(&response.body)
        .ok()
        .and_then(ErrorResponse::into_message)
        .unwrap_or_else(|| {
            let text = response.text();
            if text.trim().is_empty() {
                format!("HTTP {}", response.status)
            } else {
                text
            }
        })
}

fn require_token(value: String, field: &str) -> Result<String, AuthBackendError> {
    if value.trim().is_empty() {
        return Err(AuthBackendError::InvalidResponse(format!(
            "empty `{field}` token"
        )));
    }
    Ok(value)
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, AuthBackendError> {
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        let response: LoginResponse = self.post(LOGIN_PATH, body).await?;

        Ok(LoginGrant {
            access: require_token(response.access, "access")?,
            refresh: response.refresh.filter(|r| !r.trim().is_empty()),
            user: response.user,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, AuthBackendError> {
        let response: RefreshResponse = self
            .post(REFRESH_PATH, json!({ "refresh": refresh_token }))
            .await?;

        Ok(RefreshGrant {
            access: require_token(response.access, "access")?,
            refresh: response.refresh.filter(|r| !r.trim().is_empty()),
        })
    }
}
