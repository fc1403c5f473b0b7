//! Request specification type

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::HttpMethod;
use crate::error::{DomainError, DomainResult};

/// A logical call against the portal backend.
///
/// Paths are relative to the configured base URL (e.g. `/events/42`).
/// Authentication is never part of the request itself; the pipeline
/// attaches the bearer credential on every dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the API base URL
    pub path: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
    /// Per-request timeout overriding the client default
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Creates a request with no query and no body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Creates a POST request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    /// Creates a PUT request with a JSON body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, path).with_body(body)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Serializes `body` into a JSON request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn json<T: Serialize>(
        method: HttpMethod,
        path: impl Into<String>,
        body: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(method, path).with_body(serde_json::to_value(body)?))
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Appends a query parameter only when a value is present.
    #[must_use]
    pub fn with_optional_query<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_query(name, v),
            None => self,
        }
    }

    /// Overrides the client-wide request timeout for this call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates the request before it is dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPath`] when the path is empty or
    /// does not start with `/`.
    pub fn validate(&self) -> DomainResult<()> {
        if self.path.trim().is_empty() {
            return Err(DomainError::InvalidPath("path is required".to_string()));
        }
        if !self.path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "path must start with '/': {}",
                self.path
            )));
        }
        Ok(())
    }
}
