//! Response specification type

use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;

/// HTTP status returned by the backend for an invalid or expired access token.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// A response received from the portal backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lower-cased names)
    pub headers: BTreeMap<String, String>,
    /// Raw response body
    pub body: Vec<u8>,
    /// Time between dispatch and the last body byte
    pub duration: Duration,
}

impl ApiResponse {
    /// Creates a new response.
    #[must_use]
    pub const fn new(
        status: u16,
        headers: BTreeMap<String, String>,
        body: Vec<u8>,
        duration: Duration,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            duration,
        }
    }

    /// Creates a response with a JSON body and no headers.
    #[must_use]
    pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
            ..Self::default()
        }
    }

    /// Returns true if the status code indicates success (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns true if the backend rejected the access token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.status == STATUS_UNAUTHORIZED
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the body as JSON.
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Option<T>`
    /// targets accept `204 No Content` responses.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.is_empty() {
            return serde_json::from_slice(b"null");
        }
        serde_json::from_slice(&self.body)
    }
}
