//! Session events and status types.

use std::time::Duration;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user logged out.
    UserRequested,
    /// The session could not be refreshed; the user must log in again.
    SessionExpired,
}

impl LogoutReason {
    /// Get a user-friendly message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::UserRequested => "Logged out",
            Self::SessionExpired => "Your session has expired, please log in again",
        }
    }
}

/// Events published by the session guard for the view layer.
///
/// `LoggedOut { reason: SessionExpired }` is the forced-logout signal: the
/// view layer should route to its login entry point when it sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login succeeded.
    LoggedIn {
        /// Name of the logged-in user.
        username: String,
    },
    /// The access token was replaced by a refresh.
    Refreshed {
        /// Preview of the new token.
        token_preview: String,
    },
    /// The session ended.
    LoggedOut {
        /// Why it ended.
        reason: LogoutReason,
    },
}

impl SessionEvent {
    /// True for a logout the user did not ask for.
    #[must_use]
    pub const fn is_forced_logout(&self) -> bool {
        matches!(
            self,
            Self::LoggedOut {
                reason: LogoutReason::SessionExpired
            }
        )
    }
}

/// Status of the session for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// No access token is held.
    NotAuthenticated,
    /// The access token is outside the refresh window.
    Valid {
        /// Time until the token enters the refresh window.
        refresh_in: Duration,
    },
    /// The access token will be refreshed on the next call.
    Expiring {
        /// Whether a refresh token is available.
        can_refresh: bool,
    },
}

impl SessionStatus {
    /// Returns true if requests can be authenticated without a new login.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(
            self,
            Self::Valid { .. } | Self::Expiring {
                can_refresh: true
            }
        )
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Not authenticated".to_string(),
            Self::Valid { refresh_in } => {
                let secs = refresh_in.as_secs();
                if secs > 3600 {
                    format!("Valid, refresh due in {} hours", secs / 3600)
                } else if secs > 60 {
                    format!("Valid, refresh due in {} minutes", secs / 60)
                } else {
                    format!("Valid, refresh due in {secs} seconds")
                }
            }
            Self::Expiring { can_refresh: true } => "Expiring (will auto-refresh)".to_string(),
            Self::Expiring { can_refresh: false } => "Expiring (login required)".to_string(),
        }
    }
}
