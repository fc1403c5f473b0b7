//! Client configuration

use std::time::Duration;

use portal_domain::RefreshPolicy;

/// Default time allowed for a data request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time allowed for a refresh call before the session is torn down.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Default lifetime of a cache entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Name of the cache-busting query parameter added to GET requests.
pub const CACHE_BUSTING_PARAM: &str = "_";

/// Tunables of the session guard, request pipeline and scoped cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout of a data request, unless the request overrides it
    pub request_timeout: Duration,
    /// Timeout of a refresh call
    pub refresh_timeout: Duration,
    /// Lifetime of a cache entry
    pub cache_ttl: Duration,
    /// When the access token counts as expiring
    pub refresh_policy: RefreshPolicy,
    /// Add a cache-busting parameter to GET requests
    pub cache_busting: bool,
    /// Buffer of the session event channel
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            refresh_policy: RefreshPolicy::default(),
            cache_busting: true,
            event_capacity: 16,
        }
    }
}

impl ClientConfig {
    /// Sets the data request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the refresh timeout.
    #[must_use]
    pub const fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Sets the cache entry lifetime.
    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the token freshness policy.
    #[must_use]
    pub const fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// Enables or disables the cache-busting parameter.
    #[must_use]
    pub const fn with_cache_busting(mut self, enabled: bool) -> Self {
        self.cache_busting = enabled;
        self
    }
}
