use std::time::Duration;

use oidping_core::auth::{ConfigError, ConfigSource};
use url::Url;

/// Reads `Section:Key` configuration keys from the process environment.
///
/// `:` is not portable in variable names, so `OpenIdConnect:ClientId` is
/// looked up as `OpenIdConnect__ClientId`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl EnvSource {
    pub fn var_name(key: &str) -> String {
        key.replace(':', "__")
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::var_name(key)).ok()
    }
}

/// Cookie and session settings for the auth layer.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl: Duration,
    /// Public origin of this service; the callback URI is derived from it.
    pub base_url: Url,
    /// Prepended to scheme names to form cookie names.
    pub cookie_prefix: String,
    pub cookie_secure: bool,
    /// Upper bound on each call to the authority during the callback.
    pub remote_timeout: Duration,
}

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_SESSION_TTL_DAYS: u64 = 7;
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

impl AuthConfig {
    /// Default settings for a service reachable at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_DAYS * 24 * 60 * 60),
            base_url,
            cookie_prefix: ".oidping".to_string(),
            cookie_secure: true,
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        }
    }

    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AUTH_BASE_URL`: Public origin for callback redirects (default: `http://localhost:3000`)
    /// - `SESSION_TTL_DAYS`: Session TTL in days (default: 7)
    /// - `COOKIE_SECURE`: Whether to set the secure flag on cookies (default: true)
    /// - `OIDC_HTTP_TIMEOUT_SECS`: Timeout for token and userinfo calls (default: 10)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("AUTH_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url).map_err(|e| invalid("AUTH_BASE_URL", e))?;
        let defaults = Self::new(base_url);

        let session_ttl = match lookup("SESSION_TTL_DAYS") {
            Some(raw) => {
                let days: u64 = raw.parse().map_err(|e| invalid("SESSION_TTL_DAYS", e))?;
                Duration::from_secs(days * 24 * 60 * 60)
            }
            None => defaults.session_ttl,
        };

        let cookie_secure = lookup("COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.cookie_secure);

        let remote_timeout = match lookup("OIDC_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .map_err(|e| invalid("OIDC_HTTP_TIMEOUT_SECS", e))?,
            ),
            None => defaults.remote_timeout,
        };

        Ok(Self {
            session_ttl,
            cookie_secure,
            remote_timeout,
            ..defaults
        })
    }

    /// Cookie name for a scheme, e.g. `.oidping.Identity.Application`.
    pub fn cookie_name(&self, scheme: &str) -> String {
        format!("{}.{}", self.cookie_prefix, scheme)
    }
}

fn invalid(field: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: err.to_string(),
    }
}
