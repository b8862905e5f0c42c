//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `EMPORIUM_API_URL` - Base URL of the REST backend
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `EMPORIUM_REALTIME_URL` - Server-sent event stream (default: `{EMPORIUM_API_URL}/events`)
//! - `EMPORIUM_SERVICE_TOKEN` - Bearer token for the realtime stream
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `CACHE_TTL_SECS` - Query cache time-to-live (default: 60)
//! - `CACHE_MAX_CAPACITY` - Query cache entry limit (default: 1000)
//! - `API_RETRY_COUNT` - Extra attempts for failed reads (default: 1)
//! - `API_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `REALTIME_RECONNECT_SECS` - Delay before reconnecting the event stream (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
///
/// Implements `Debug` manually to redact the service token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// REST backend base URL, without a trailing slash
    pub api_url: Url,
    /// Server-sent event stream for cache invalidation
    pub realtime_url: Url,
    /// Bearer token presented to the realtime stream
    pub service_token: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// How long a cached query stays fresh
    pub cache_ttl: Duration,
    /// Maximum number of cached queries
    pub cache_max_capacity: u64,
    /// Extra attempts for reads that fail with a transport error or 5xx
    pub api_retry_count: u32,
    /// Per-request timeout for REST calls
    pub api_timeout: Duration,
    /// Delay before the realtime listener reconnects
    pub realtime_reconnect: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url.as_str())
            .field("realtime_url", &self.realtime_url.as_str())
            .field(
                "service_token",
                &self.service_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_max_capacity", &self.cache_max_capacity)
            .field("api_retry_count", &self.api_retry_count)
            .field("api_timeout", &self.api_timeout)
            .field("realtime_reconnect", &self.realtime_reconnect)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[SET]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish_non_exhaustive()
    }
}

impl StorefrontConfig {
    /// Configuration with every optional setting at its default.
    ///
    /// The realtime stream defaults to `{api_url}/events`.
    #[must_use]
    pub fn new(api_url: Url, base_url: impl Into<String>) -> Self {
        let realtime_url = default_realtime_url(&api_url);
        Self {
            api_url,
            realtime_url,
            service_token: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: base_url.into(),
            cache_ttl: Duration::from_secs(60),
            cache_max_capacity: 1000,
            api_retry_count: 1,
            api_timeout: Duration::from_secs(15),
            realtime_reconnect: Duration::from_secs(5),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the service token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_url("EMPORIUM_API_URL", &get_required_env("EMPORIUM_API_URL")?)?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let mut config = Self::new(api_url, base_url);

        if let Some(raw) = get_optional_env("EMPORIUM_REALTIME_URL") {
            config.realtime_url = parse_url("EMPORIUM_REALTIME_URL", &raw)?;
        }
        config.service_token = get_optional_env("EMPORIUM_SERVICE_TOKEN")
            .map(|token| {
                validate_secret_strength(&token, "EMPORIUM_SERVICE_TOKEN")?;
                Ok::<_, ConfigError>(SecretString::from(token))
            })
            .transpose()?;

        config.host = parse_env_or_default("STOREFRONT_HOST", config.host)?;
        config.port = parse_env_or_default("STOREFRONT_PORT", config.port)?;
        config.cache_ttl = Duration::from_secs(parse_env_or_default("CACHE_TTL_SECS", 60)?);
        config.cache_max_capacity = parse_env_or_default("CACHE_MAX_CAPACITY", 1000)?;
        config.api_retry_count = parse_env_or_default("API_RETRY_COUNT", 1)?;
        config.api_timeout = Duration::from_secs(parse_env_or_default("API_TIMEOUT_SECS", 15)?);
        config.realtime_reconnect =
            Duration::from_secs(parse_env_or_default("REALTIME_RECONNECT_SECS", 5)?);

        config.sentry_dsn = get_optional_env("SENTRY_DSN");
        config.sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        config.sentry_sample_rate = parse_env_or_default("SENTRY_SAMPLE_RATE", 1.0)?;
        config.sentry_traces_sample_rate = parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", 0.0)?;

        Ok(config)
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Session cookies are marked `Secure` when served over HTTPS.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn default_realtime_url(api_url: &Url) -> Url {
    let mut url = api_url.clone();
    let path = format!("{}/events", api_url.path().trim_end_matches('/'));
    url.set_path(&path);
    url
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig::new(
            Url::parse("https://api.emporium.test/v1").unwrap(),
            "https://shop.emporium.test",
        )
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-token-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.realtime_url.as_str(), "https://api.emporium.test/v1/events");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_max_capacity, 1000);
        assert_eq!(config.api_retry_count, 1);
        assert_eq!(config.realtime_reconnect, Duration::from_secs(5));
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_default_realtime_url_at_root() {
        let url = default_realtime_url(&Url::parse("http://127.0.0.1:9000").unwrap());
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/events");
    }

    #[test]
    fn test_parse_url_rejects_other_schemes() {
        assert!(parse_url("EMPORIUM_API_URL", "ftp://files.test").is_err());
        assert!(parse_url("EMPORIUM_API_URL", "not a url").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = config();
        config.service_token = Some(SecretString::from("tok_9f8A7b6C5d4E3f2G"));
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tok_9f8A7b6C5d4E3f2G"));
        assert_eq!(
            config.service_token.unwrap().expose_secret(),
            "tok_9f8A7b6C5d4E3f2G"
        );
    }
}
