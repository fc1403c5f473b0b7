//! Session and credential types

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// Returns a short, log-safe preview of a credential (first 8 chars + ...).
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.chars().count() > 12 {
        let head: String = token.chars().take(8).collect();
        format!("{head}...")
    } else {
        "***".to_string()
    }
}

/// Username/password pair submitted to the login endpoint.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Creates a new credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Checks that both fields are filled in.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidCredentials`] if a field is blank.
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::InvalidCredentials(
                "username is required".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(DomainError::InvalidCredentials(
                "password is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// User metadata returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Login name
    pub username: String,
    /// Human readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Role in the portal (e.g. "admin", "editor")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Fields not modelled by the client
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl UserProfile {
    /// Creates a profile with only a username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            display_name: None,
            role: None,
            extra: BTreeMap::new(),
        }
    }

    /// Returns the display name, falling back to the username.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// A bearer credential together with the moment it was issued.
///
/// Keeping both in one value makes "token present without issue time"
/// unrepresentable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Opaque bearer value
    #[serde(rename = "access_token")]
    pub value: String,
    /// When the backend issued this token
    pub issued_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates a token issued at `issued_at`.
    #[must_use]
    pub fn new(value: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            issued_at,
        }
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.value)
    }

    /// Log-safe preview of the token.
    #[must_use]
    pub fn preview(&self) -> String {
        token_preview(&self.value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &self.preview())
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// The authenticated session: the token pair plus user metadata.
///
/// This is the only client state that is persisted across restarts.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Current access token, absent when not authenticated
    #[serde(default, flatten, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessToken>,
    /// Credential used only to mint new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Logged-in user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl Session {
    /// Creates a session from a successful login.
    #[must_use]
    pub fn new(access: AccessToken, refresh_token: Option<String>, user: Option<UserProfile>) -> Self {
        Self {
            access: Some(access),
            refresh_token,
            user,
        }
    }

    /// True iff an access token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access.is_some()
    }

    /// True when nothing at all is stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }

    /// Returns the current bearer value.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access.as_ref().map(|a| a.value.as_str())
    }

    /// Returns when the current access token was issued.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.access.as_ref().map(|a| a.issued_at)
    }

    /// Replaces the access token after a successful refresh.
    ///
    /// A refresh response may rotate the refresh token as well.
    pub fn replace_access(&mut self, access: AccessToken, rotated_refresh: Option<String>) {
        self.access = Some(access);
        if rotated_refresh.is_some() {
            self.refresh_token = rotated_refresh;
        }
    }

    /// Destroys the session.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access", &self.access)
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(token_preview),
            )
            .field("user", &self.user)
            .finish()
    }
}
