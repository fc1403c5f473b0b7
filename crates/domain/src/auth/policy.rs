//! Access-token freshness policy

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use super::AccessToken;

/// Assumed validity window of an access token.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// How long before the assumed expiry a token is refreshed proactively.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Decides when an access token is stale enough to refresh.
///
/// By default the decision is a client-side heuristic: the token is
/// considered expiring once `now - issued_at > lifetime - safety_margin`.
/// With `prefer_token_expiry`, a JWT `exp` claim (when present and
/// readable) replaces the assumed lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Assumed validity window of an access token
    pub lifetime: Duration,
    /// Buffer before expiry during which the token counts as expiring
    pub safety_margin: Duration,
    /// Use the token's own `exp` claim when it carries one
    pub prefer_token_expiry: bool,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_TOKEN_LIFETIME,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            prefer_token_expiry: false,
        }
    }
}

impl RefreshPolicy {
    /// Creates a heuristic policy.
    #[must_use]
    pub const fn new(lifetime: Duration, safety_margin: Duration) -> Self {
        Self {
            lifetime,
            safety_margin,
            prefer_token_expiry: false,
        }
    }

    /// Enables reading the expiry from a JWT `exp` claim.
    #[must_use]
    pub const fn with_token_expiry(mut self, prefer: bool) -> Self {
        self.prefer_token_expiry = prefer;
        self
    }

    /// The instant after which `token` counts as expiring.
    #[must_use]
    pub fn refresh_deadline(&self, token: &AccessToken) -> DateTime<Utc> {
        let margin = to_delta(self.safety_margin);
        if self.prefer_token_expiry
            && let Some(expires_at) = jwt_expiry(&token.value)
        {
            return expires_at - margin;
        }
        token.issued_at + to_delta(self.lifetime.saturating_sub(self.safety_margin))
    }

    /// True iff `token` should be refreshed at `now`.
    #[must_use]
    pub fn is_expiring(&self, token: &AccessToken, now: DateTime<Utc>) -> bool {
        now > self.refresh_deadline(token)
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Reads the `exp` claim of a JWT without verifying its signature.
///
/// Returns `None` for opaque tokens or tokens without an `exp` claim.
#[must_use]
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claim.exp, 0)
}
