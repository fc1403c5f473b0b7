//! HTTP transport port

use std::time::Duration;

use async_trait::async_trait;
use portal_domain::{ApiRequest, ApiResponse, HttpMethod};
use serde_json::Value;
use thiserror::Error;

/// Transport-level failures (no HTTP status was received).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds
        timeout_ms: u64,
    },

    /// DNS resolution failed.
    #[error("could not resolve {host}: {message}")]
    DnsError {
        /// Host that failed to resolve
        host: String,
        /// Resolver message
        message: String,
    },

    /// The server refused the connection.
    #[error("connection refused by {host}:{port}")]
    ConnectionRefused {
        /// Target host
        host: String,
        /// Target port
        port: u16,
    },

    /// Any other connection-level failure.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The base URL and path did not form a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Anything else reported by the HTTP stack.
    #[error("{0}")]
    Other(String),
}

/// A fully prepared request, ready to be put on the wire.
///
/// Built by the pipeline from an [`ApiRequest`]: the bearer credential and
/// any cache-busting parameter are already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the API base URL
    pub path: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
    /// Bearer credential for the `Authorization` header
    pub bearer: Option<String>,
    /// Time allowed for the whole exchange
    pub timeout: Duration,
}

impl OutboundRequest {
    /// Prepares `request` for dispatch.
    #[must_use]
    pub fn from_request(request: &ApiRequest, bearer: Option<String>, timeout: Duration) -> Self {
        Self {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            bearer,
            timeout,
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Returns the value of the first query parameter called `name`.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Port for putting requests on the wire.
///
/// Implementations must not interpret the status code: a 401 or 500 is a
/// successful transport exchange and is returned as an [`ApiResponse`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request and collects the full response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no HTTP response was received.
    async fn dispatch(&self, request: &OutboundRequest) -> Result<ApiResponse, TransportError>;
}
