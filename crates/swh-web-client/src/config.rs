//! Web API client configuration.
//!
//! Defaults point at the public Software Heritage archive. Override via
//! environment variables or explicit construction for staging/testing.

use url::Url;
use zeroize::Zeroizing;

/// Root of the public archive API.
pub const DEFAULT_API_URL: &str = "https://archive.softwareheritage.org/api/1";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the archive web API.
///
/// Custom `Debug` implementation redacts the `refresh_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct WebApiConfig {
    /// API root; every relative query is appended to it with `/`.
    /// Default: <https://archive.softwareheritage.org/api/1>
    pub api_url: Url,
    /// Request timeout in seconds, handed to the HTTP transport untouched.
    pub timeout_secs: u64,
    /// Long-lived refresh token used to open an authenticated session.
    pub refresh_token: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for WebApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebApiConfig")
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl WebApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SWH_API_URL` (default: `https://archive.softwareheritage.org/api/1`)
    /// - `SWH_TIMEOUT_SECS` (default: 30)
    /// - `SWH_REFRESH_TOKEN` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: env_url("SWH_API_URL", DEFAULT_API_URL)?,
            timeout_secs: env_number("SWH_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            refresh_token: std::env::var("SWH_REFRESH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .map(Zeroizing::new),
        })
    }

    /// Anonymous configuration for the public archive.
    pub fn public_archive() -> Result<Self, ConfigError> {
        Self::with_api_url(DEFAULT_API_URL)
    }

    /// Anonymous configuration pointed at an arbitrary API root (a mock
    /// server, a staging archive, a mirror).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `api_url` cannot be parsed.
    pub fn with_api_url(api_url: &str) -> Result<Self, ConfigError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| ConfigError::InvalidUrl("api_url".to_string(), e.to_string()))?;
        Ok(Self {
            api_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh_token: None,
        })
    }
}

pub(crate) fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
}
