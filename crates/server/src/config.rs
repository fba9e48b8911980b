//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BRANA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`;
//!   not required when `BRANA_IN_MEMORY=true`)
//! - `BRANA_TOKEN_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `BRANA_HOST` - Bind address (default: 127.0.0.1)
//! - `BRANA_PORT` - Listen port (default: 5000)
//! - `BRANA_PUBLIC_URL` - Public URL of the web client, used in reset links
//!   (default: <http://localhost:3000>)
//! - `BRANA_TOKEN_TTL_HOURS` - Bearer token lifetime (default: 168)
//! - `BRANA_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `BRANA_SHIPPING_COST` - Flat shipping cost per order (default: 50)
//! - `BRANA_TAX_RATE` - Tax rate applied to subtotals (default: 0.15)
//! - `BRANA_RATE_LIMIT` - Enable per-IP rate limiting (default: true)
//! - `BRANA_LOG_JSON` - Emit JSON log lines (default: false)
//! - `BRANA_IN_MEMORY` - Use the in-memory store instead of `PostgreSQL` (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use brana_core::OrderPricing;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 168;
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

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

/// Where records are kept.
#[derive(Clone)]
pub enum StoreConfig {
    /// `PostgreSQL` connection URL (contains password)
    Postgres(SecretString),
    /// Process-local store, lost on restart
    InMemory,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres(_) => f.write_str("Postgres([REDACTED])"),
            Self::InMemory => f.write_str("InMemory"),
        }
    }
}

/// Server application configuration.
///
/// Implements `Debug` manually to redact the token secret.
#[derive(Clone)]
pub struct ServerConfig {
    /// Record store backend
    pub store: StoreConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public URL of the web client, without trailing slash
    pub public_url: String,
    /// Bearer token signing secret
    pub token_secret: SecretString,
    /// Bearer token lifetime in hours
    pub token_ttl_hours: i64,
    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
    /// Checkout shipping and tax
    pub pricing: OrderPricing,
    /// Whether per-IP rate limiting is applied
    pub rate_limit: bool,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("store", &self.store)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("public_url", &self.public_url)
            .field("token_secret", &"[REDACTED]")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("cors_origins", &self.cors_origins)
            .field("pricing", &self.pricing)
            .field("rate_limit", &self.rate_limit)
            .field("log_json", &self.log_json)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ServerConfig {
    /// Configuration with every optional setting at its default.
    ///
    /// `from_env` starts from this and applies overrides; tests and tooling
    /// use it directly with the in-memory store.
    #[must_use]
    pub fn with_defaults(store: StoreConfig, token_secret: SecretString) -> Self {
        Self {
            store,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            public_url: "http://localhost:3000".to_string(),
            token_secret,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            cors_origins: Vec::new(),
            pricing: OrderPricing::default(),
            rate_limit: true,
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let in_memory = parse_env("BRANA_IN_MEMORY", false)?;
        let store = if in_memory {
            StoreConfig::InMemory
        } else {
            StoreConfig::Postgres(get_database_url("BRANA_DATABASE_URL")?)
        };

        let token_secret = get_validated_secret("BRANA_TOKEN_SECRET")?;
        validate_token_secret(&token_secret, "BRANA_TOKEN_SECRET")?;

        let mut config = Self::with_defaults(store, token_secret);
        config.host = parse_env("BRANA_HOST", config.host)?;
        config.port = parse_env("BRANA_PORT", config.port)?;
        if let Some(public_url) = get_optional_env("BRANA_PUBLIC_URL") {
            config.public_url = parse_public_url(&public_url)?;
        }
        config.token_ttl_hours = parse_env("BRANA_TOKEN_TTL_HOURS", config.token_ttl_hours)?;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&config.token_ttl_hours) {
            return Err(ConfigError::InvalidEnvVar(
                "BRANA_TOKEN_TTL_HOURS".to_string(),
                format!("must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
            ));
        }
        config.cors_origins = get_optional_env("BRANA_CORS_ORIGINS")
            .map(|origins| parse_origins(&origins))
            .unwrap_or_default();
        config.pricing = OrderPricing {
            shipping_cost: parse_money_env("BRANA_SHIPPING_COST", config.pricing.shipping_cost)?,
            tax_rate: parse_money_env("BRANA_TAX_RATE", config.pricing.tax_rate)?,
        };
        config.rate_limit = parse_env("BRANA_RATE_LIMIT", config.rate_limit)?;
        config.log_json = parse_env("BRANA_LOG_JSON", config.log_json)?;
        config.sentry_dsn = get_optional_env("SENTRY_DSN");
        config.sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(config)
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Parse a non-negative decimal environment variable.
fn parse_money_env(key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    let value = parse_env(key, default)?;
    if value.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(value)
}

/// Validate the public URL and strip any trailing slash.
fn parse_public_url(value: &str) -> Result<String, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("BRANA_PUBLIC_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "BRANA_PUBLIC_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.trim_end_matches('/').to_string())
        .collect()
}

/// Validate that a token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.len() as f64;
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-token-secret-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_token_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_token_secret(&secret, "TEST_TOKEN").is_err());
    }

    #[test]
    fn test_defaults() {
        let config =
            ServerConfig::with_defaults(StoreConfig::InMemory, SecretString::from("x".repeat(32)));

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5000);
        assert_eq!(config.token_ttl_hours, 168);
        assert_eq!(config.pricing, OrderPricing::default());
        assert!(config.rate_limit);
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://localhost:3000/, https://brana.art ,,"),
            vec!["http://localhost:3000", "https://brana.art"]
        );
    }

    #[test]
    fn test_parse_public_url() {
        assert_eq!(
            parse_public_url("https://brana.art/").unwrap(),
            "https://brana.art"
        );
        assert!(parse_public_url("ftp://brana.art").is_err());
        assert!(parse_public_url("not a url").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ServerConfig::with_defaults(
            StoreConfig::Postgres(SecretString::from("postgres://brana:hunter2@db/brana")),
            SecretString::from("super_secret_signing_key_value_123"),
        );

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("super_secret_signing_key_value_123"));
    }
}
