//! Support desk configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CAYMAN_DATABASE_URL` - Cayman National `PostgreSQL` connection string
//! - `BAHAMAS_DATABASE_URL` - Bahamas Trust `PostgreSQL` connection string
//! - `BERMUDA_DATABASE_URL` - Bermuda Commercial `PostgreSQL` connection string
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SUPPORT_INBOX_POLL_MS` - Session list polling interval (default: 3000, min: 250)
//! - `SUPPORT_THREAD_POLL_MS` - Message thread polling interval (default: 3000, min: 250)
//! - `SUPPORT_STAFF_NAME` - Sender name for replies when the staff record has none (default: Support)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use bankdesk_core::TenantKey;

use crate::tenancy::TenantRegistry;

const DEFAULT_POLL_MS: u64 = 3000;
const MIN_POLL_MS: u64 = 250;
const DEFAULT_STAFF_NAME: &str = "Support";

/// Blocklist of placeholder patterns in connection strings (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "placeholder",
    "xxx",
    "insert",
    "put-your",
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

/// Support desk configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// One connection per registered tenant, in registry order
    pub tenants: Vec<TenantConnection>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Polling and reply settings
    pub support: SupportConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Connection info for one tenant store.
///
/// Implements `Debug` manually to redact the connection string.
#[derive(Clone)]
pub struct TenantConnection {
    pub key: TenantKey,
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: SecretString,
}

impl std::fmt::Debug for TenantConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConnection")
            .field("key", &self.key)
            .field("database_url", &"[REDACTED]")
            .finish()
    }
}

/// Live-support polling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportConfig {
    /// How often an open session list re-aggregates
    pub inbox_poll_interval: Duration,
    /// How often an open thread re-fetches its messages
    pub thread_poll_interval: Duration,
    /// Fallback sender name for staff replies
    pub staff_name: String,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            inbox_poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            thread_poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            staff_name: DEFAULT_STAFF_NAME.to_string(),
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a tenant URL is missing or malformed, or if
    /// an optional variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let tenants = TenantKey::ALL
            .into_iter()
            .map(TenantConnection::from_env)
            .collect::<Result<Vec<_>, _>>()?;

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let support = SupportConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            tenants,
            host,
            port,
            support,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl TenantConnection {
    /// Read one tenant's connection string from its registry variable.
    ///
    /// Used directly by the CLI, which only needs the tenants it migrates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the variable is missing or not a
    /// `PostgreSQL` URL.
    pub fn from_env(key: TenantKey) -> Result<Self, ConfigError> {
        let var = TenantRegistry::descriptor(key).database_url_var;
        let database_url = get_required_secret(var)?;
        validate_database_url(&database_url, var)?;
        Ok(Self { key, database_url })
    }
}

impl SupportConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            inbox_poll_interval: parse_poll_interval(
                "SUPPORT_INBOX_POLL_MS",
                get_optional_env("SUPPORT_INBOX_POLL_MS").as_deref(),
            )?,
            thread_poll_interval: parse_poll_interval(
                "SUPPORT_THREAD_POLL_MS",
                get_optional_env("SUPPORT_THREAD_POLL_MS").as_deref(),
            )?,
            staff_name: get_env_or_default("SUPPORT_STAFF_NAME", DEFAULT_STAFF_NAME),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a polling interval in milliseconds, falling back to the default.
fn parse_poll_interval(var_name: &str, value: Option<&str>) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(Duration::from_millis(DEFAULT_POLL_MS));
    };

    let ms = value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if ms < MIN_POLL_MS {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("must be at least {MIN_POLL_MS} ms (got {ms})"),
        ));
    }
    Ok(Duration::from_millis(ms))
}

/// Validate that a connection string is a `PostgreSQL` URL and not a placeholder.
fn validate_database_url(url: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = url.expose_secret();
    if !(value.starts_with("postgres://") || value.starts_with("postgresql://")) {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must start with postgres:// or postgresql://".to_string(),
        ));
    }

    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}
