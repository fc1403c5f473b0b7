//! CLI settings: defaults, an optional TOML file, then `PORTAL_*` variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use portal_application::ClientConfig;
use portal_domain::RefreshPolicy;
use portal_infrastructure::default_session_path;
use serde::Deserialize;

/// Settings file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

/// Prefix of the environment variables that override the file.
pub const ENV_PREFIX: &str = "PORTAL";

/// Resolved CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Root of the portal API, e.g. `https://portal.example.com/api`
    pub base_url: String,
    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Where the session is kept between runs
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// Timeout of a data request
    pub request_timeout_secs: u64,
    /// Timeout of a refresh call
    pub refresh_timeout_secs: u64,
    /// Lifetime of a cached read
    pub cache_ttl_secs: u64,
    /// Assumed access token lifetime
    pub token_lifetime_secs: u64,
    /// How long before expiry the token is refreshed
    pub refresh_margin_secs: u64,
    /// Read the expiry from the token's `exp` claim when present
    pub prefer_token_expiry: bool,
    /// Add a cache-busting parameter to GET requests
    pub cache_busting: bool,
}

impl Settings {
    /// Loads settings from `path` (required) or `portal.toml` (optional),
    /// overridden by the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_from(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .set_default("base_url", "http://localhost:8000/api")?
            .set_default("log_level", "warn")?
            .set_default("request_timeout_secs", 30_i64)?
            .set_default("refresh_timeout_secs", 15_i64)?
            .set_default("cache_ttl_secs", 300_i64)?
            .set_default("token_lifetime_secs", 3600_i64)?
            .set_default("refresh_margin_secs", 300_i64)?
            .set_default("prefer_token_expiry", false)?
            .set_default("cache_busting", true)?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }

    /// The library configuration these settings describe.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let policy = RefreshPolicy::new(
            Duration::from_secs(self.token_lifetime_secs),
            Duration::from_secs(self.refresh_margin_secs),
        )
        .with_token_expiry(self.prefer_token_expiry);

        ClientConfig::default()
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_refresh_timeout(Duration::from_secs(self.refresh_timeout_secs))
            .with_cache_ttl(Duration::from_secs(self.cache_ttl_secs))
            .with_refresh_policy(policy)
            .with_cache_busting(self.cache_busting)
    }

    /// The session file, falling back to the platform data directory.
    #[must_use]
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file.clone().or_else(default_session_path)
    }
}
